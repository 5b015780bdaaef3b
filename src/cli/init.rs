//! Init command implementation
//!
//! Scaffolds a memchat project: `memchat.toml`, `.env.example` and a
//! `.gitignore` keeping secrets out of version control.

use super::output::Output;
use std::fs;
use std::path::Path;

/// Result of the init operation
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// Project already exists (memchat.toml found)
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: std::path::PathBuf,
    /// Overwrite existing files
    pub force: bool,
    /// Leave out the example personas
    pub minimal: bool,
    /// Completion provider to configure (groq, openai or gemini)
    pub provider: String,
    /// Memory write gate (keyword or classifier)
    pub gate: String,
    /// Host address for the server
    pub host: String,
    /// Port for the server
    pub port: u16,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing memchat project");

    let base_path = &config.path;

    let config_path = base_path.join("memchat.toml");
    if config_path.exists() && !config.force {
        output.warning("memchat.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    if !base_path.exists() {
        if let Err(e) = fs::create_dir_all(base_path) {
            output.error(&format!("Failed to create {}: {}", base_path.display(), e));
            return InitResult::Error(e.to_string());
        }
        output.created_dir(&base_path.display().to_string());
    }

    output.subheader("Creating configuration files");

    let toml_content = generate_memchat_toml(&config);
    if let Err(e) = write_file(&config_path, &toml_content, config.force) {
        output.error(&format!("Failed to create memchat.toml: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", "memchat.toml");

    let env_example_path = base_path.join(".env.example");
    let env_content = generate_env_example(&config);
    if let Err(e) = write_file(&env_example_path, &env_content, config.force) {
        output.error(&format!("Failed to create .env.example: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("env", ".env.example");

    // Create .gitignore if it doesn't exist
    let gitignore_path = base_path.join(".gitignore");
    if !gitignore_path.exists() {
        if let Err(e) = write_file(&gitignore_path, &generate_gitignore(), false) {
            output.warning(&format!("Failed to create .gitignore: {}", e));
        } else {
            output.created("file", ".gitignore");
        }
    } else {
        output.skipped(".gitignore", "already exists");
    }

    output.complete("memchat project initialized successfully!");

    output.header("Next Steps");
    output.newline();
    output.info("1. Set up environment variables:");
    output.command("cp .env.example .env");
    output.command(&format!(
        "# Edit .env and set {} and MEM0_API_KEY",
        provider_key_env(&config.provider)
    ));
    output.newline();

    output.info("2. Start the server:");
    output.command("memchat-server");
    output.newline();

    output.info("3. Or chat from the terminal:");
    output.command("memchat-server chat --user Alex");
    output.newline();

    output.hint(&format!(
        "Server will be available at http://{}:{}",
        config.host, config.port
    ));
    output.hint("OpenAPI document available at /api/openapi.json");

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(()); // Skip existing files unless force is true
    }
    fs::write(path, content)
}

fn provider_key_env(provider: &str) -> &'static str {
    match provider {
        "openai" => "OPENAI_API_KEY",
        "gemini" => "GEMINI_API_KEY",
        _ => "GROQ_API_KEY",
    }
}

fn generate_memchat_toml(config: &InitConfig) -> String {
    let (provider_name, provider_section) = match config.provider.as_str() {
        "openai" => (
            "openai",
            r#"# OpenAI API (set OPENAI_API_KEY in .env)
[providers.openai]
type = "openai"
api_key_env = "OPENAI_API_KEY"
api_base = "https://api.openai.com/v1"
default_model = "gpt-4o-mini"
"#,
        ),
        "gemini" => (
            "gemini",
            r#"# Google Generative Language API (set GEMINI_API_KEY in .env)
[providers.gemini]
type = "gemini"
api_key_env = "GEMINI_API_KEY"
api_base = "https://generativelanguage.googleapis.com/v1beta"
default_model = "gemma-3-27b-it"
"#,
        ),
        _ => (
            "groq",
            r#"# Groq's OpenAI-compatible API (set GROQ_API_KEY in .env)
[providers.groq]
type = "openai"
api_key_env = "GROQ_API_KEY"
api_base = "https://api.groq.com/openai/v1"
default_model = "moonshotai/kimi-k2-instruct"
"#,
        ),
    };

    let gate = if config.gate == "classifier" {
        "classifier"
    } else {
        "keyword"
    };

    let personas = if config.minimal {
        ""
    } else {
        r#"
# =============================================================================
# Personas
# =============================================================================
# A persona replaces the memory prompt while selected. Personas see no
# recalled facts, but messages are still gated for storage.

[personas.chef]
name = "Chef"
system_prompt = "You are a friendly chef. Only discuss cooking, recipes and ingredients. Politely decline anything else."
welcome = "What are we cooking today?"

[personas.coach]
name = "Fitness Coach"
system_prompt = "You are an encouraging fitness coach. Only discuss exercise, training plans and recovery. Politely decline anything else."
welcome = "Ready to move?"
"#
    };

    format!(
        r#"# memchat configuration
# =============================================================================
# API keys are read from the environment variables named here (see .env).
# This file is watched: persona and chat changes apply without a restart.

[server]
host = "{host}"
port = {port}
log_level = "info"
# "pretty" or "json"
log_format = "pretty"

[session]
# Require "connect" with a display name before chatting
require_identity = true
# default_user_id = "guest"
welcome = "Hi! I remember what you tell me about yourself. Who am I talking to?"

[chat]
provider = "{provider_name}"
temperature = 0.7
# max_tokens = 1024
stream = false
# Tell the model the user's display name
include_identity = false

[memory]
# "mem0" (hosted) or "local" (in-process, forgotten on restart)
backend = "mem0"
api_key_env = "MEM0_API_KEY"
api_base = "https://api.mem0.ai"
version = "v2"
search_limit = 5
# "keyword" (trigger phrases) or "classifier" (small model decides)
gate = "{gate}"

[classifier]
# Defaults to the chat provider
# provider = "{provider_name}"
# model = "llama-3.1-8b-instant"
temperature = 0.0
max_tokens = 20

# =============================================================================
# Providers
# =============================================================================

{provider_section}{personas}"#,
        host = config.host,
        port = config.port,
        provider_name = provider_name,
        gate = gate,
        provider_section = provider_section,
        personas = personas,
    )
}

fn generate_env_example(config: &InitConfig) -> String {
    format!(
        r#"# memchat Environment Variables
# =============================
# Copy this file to .env and fill in the values.

# REQUIRED: completion provider key
{key}=your-key-here

# REQUIRED (memory.backend = "mem0"): Mem0 platform key
MEM0_API_KEY=your-mem0-key-here

# Optional: Logging level (trace, debug, info, warn, error)
RUST_LOG=info,memchat=debug
"#,
        key = provider_key_env(&config.provider)
    )
}

fn generate_gitignore() -> String {
    r#"# Environment
.env
.env.local
.env.*.local

# Rust
/target/

# IDE
.idea/
.vscode/
*.swp
*~

# OS
.DS_Store
Thumbs.db
"#
    .to_string()
}

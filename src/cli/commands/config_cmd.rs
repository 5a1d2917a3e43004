//! config command - Show or create configuration files

use anyhow::{bail, Context as _, Result};
use serde_json::json;

use super::{load_config, workspace_dir};
use crate::cli::Context;
use crate::core::config::{Config, GlobalConfig, ServerConfig, WorkspaceConfig};
use crate::ui::output;

/// Options for `pboard config init`.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub global: bool,
    pub server: Option<String>,
    pub default_project: Option<String>,
    pub timeout_ms: Option<u64>,
    pub force: bool,
}

impl InitOptions {
    fn server_config(&self) -> Option<ServerConfig> {
        if self.server.is_none() && self.timeout_ms.is_none() {
            return None;
        }
        Some(ServerConfig {
            api_base: self.server.clone(),
            timeout_ms: self.timeout_ms,
            token: None,
        })
    }
}

/// Print the effective configuration and the files it came from.
///
/// The token is never printed, only whether one is set.
pub fn show(ctx: &Context) -> Result<()> {
    let config = load_config(ctx)?;
    let api_base = ctx.api_base.clone().unwrap_or_else(|| config.api_base());
    let project = ctx
        .project
        .as_deref()
        .or_else(|| config.default_project());

    if ctx.json {
        let value = json!({
            "api_base": api_base,
            "project": project,
            "timeout_ms": config.timeout().as_millis() as u64,
            "token_set": config.token().is_some(),
            "activation_distance": config.activation_distance(),
            "keyboard_step": config.keyboard_step(),
            "global_config": config.global_config_loaded_from(),
            "workspace_config": config.workspace_config_loaded_from(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&value).context("Failed to encode config")?
        );
        return Ok(());
    }

    let source = |path: Option<&std::path::Path>| {
        path.map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".to_string())
    };
    println!("api_base             {}", api_base);
    println!("project              {}", project.unwrap_or("(none)"));
    println!("timeout_ms           {}", config.timeout().as_millis());
    println!(
        "token                {}",
        if config.token().is_some() { "set" } else { "(none)" }
    );
    println!("activation_distance  {}", config.activation_distance());
    println!("keyboard_step        {}", config.keyboard_step());
    println!("global config        {}", source(config.global_config_loaded_from()));
    println!(
        "workspace config     {}",
        source(config.workspace_config_loaded_from())
    );
    Ok(())
}

/// Write a workspace (default) or global config file.
pub fn init(ctx: &Context, opts: InitOptions) -> Result<()> {
    if opts.global {
        if opts.default_project.is_some() {
            bail!("--default-project only applies to the workspace config");
        }
        let path = Config::global_config_path().context("Failed to locate global config")?;
        if path.exists() && !opts.force {
            bail!(
                "{} already exists. Pass --force to overwrite it.",
                path.display()
            );
        }
        let config = GlobalConfig {
            server: opts.server_config(),
            gesture: None,
        };
        config.validate().context("Invalid config")?;
        let written = Config::write_global(&config).context("Failed to write config")?;
        output::print(format!("Wrote {}", written.display()), ctx.verbosity());
        return Ok(());
    }

    let dir = workspace_dir(ctx)?;
    let path = Config::workspace_config_path(&dir);
    if path.exists() && !opts.force {
        bail!(
            "{} already exists. Pass --force to overwrite it.",
            path.display()
        );
    }
    let config = WorkspaceConfig {
        default_project: opts.default_project.clone(),
        server: opts.server_config(),
        gesture: None,
    };
    config.validate().context("Invalid config")?;
    let written = Config::write_workspace(&dir, &config).context("Failed to write config")?;
    output::print(format!("Wrote {}", written.display()), ctx.verbosity());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ctx_in(dir: &TempDir) -> Context {
        Context {
            cwd: Some(dir.path().to_path_buf()),
            quiet: true,
            ..Default::default()
        }
    }

    #[test]
    fn init_writes_workspace_config() {
        let dir = TempDir::new().unwrap();
        let opts = InitOptions {
            server: Some("http://board.test/api".into()),
            default_project: Some("lab".into()),
            ..Default::default()
        };
        init(&ctx_in(&dir), opts).unwrap();

        let text =
            std::fs::read_to_string(dir.path().join(".paperboard/config.toml")).unwrap();
        let parsed: WorkspaceConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.default_project.as_deref(), Some("lab"));
        assert_eq!(
            parsed.server.unwrap().api_base.as_deref(),
            Some("http://board.test/api")
        );
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        init(&ctx_in(&dir), InitOptions::default()).unwrap();
        let err = init(&ctx_in(&dir), InitOptions::default()).unwrap_err();
        assert!(err.to_string().contains("--force"));

        let forced = InitOptions {
            force: true,
            timeout_ms: Some(2500),
            ..Default::default()
        };
        init(&ctx_in(&dir), forced).unwrap();
    }

    #[test]
    fn init_rejects_bad_server_url() {
        let dir = TempDir::new().unwrap();
        let opts = InitOptions {
            server: Some("board.test".into()),
            ..Default::default()
        };
        assert!(init(&ctx_in(&dir), opts).is_err());
        assert!(!dir.path().join(".paperboard/config.toml").exists());
    }

    #[test]
    fn global_init_rejects_default_project() {
        let dir = TempDir::new().unwrap();
        let opts = InitOptions {
            global: true,
            default_project: Some("lab".into()),
            ..Default::default()
        };
        assert!(init(&ctx_in(&dir), opts).is_err());
    }
}

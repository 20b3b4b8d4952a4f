//! Command handlers
//!
//! 각 명령은 JSON 값을 돌려주고, 출력은 `main`이 맡는다.

use crate::app::App;
use crate::{Args, Command, FieldArgs};
use anyhow::{bail, Context};
use fillo_foundation::settings::validate_api_key;
use fillo_foundation::{
    temperature_label, CreativityPreset, Error, FieldInfo, ProviderKind, Settings, SETTINGS_FILE,
};
use fillo_generator::{GenerateOptions, MaintenanceTask, MultipleOptions};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

/// `{success: false, error}` body printed for any failed command
pub fn failure(err: &anyhow::Error) -> Value {
    json!({ "success": false, "error": format!("{:#}", err) })
}

fn success() -> Value {
    json!({ "success": true })
}

impl FieldArgs {
    fn field_info(&self) -> FieldInfo {
        let field = FieldInfo::new(&self.field_type, &self.label, &self.context);
        match &self.signature {
            Some(signature) => field.with_signature(signature),
            None => field,
        }
    }
}

pub async fn run(args: Args) -> anyhow::Result<Value> {
    let app = App::open(args.config_dir, args.cache_db).context("Failed to open Fillo storage")?;
    let generator = &app.generator;

    let output = match args.command {
        Command::Generate {
            field,
            note,
            no_cache,
            force,
            random,
            creativity,
            multiple,
        } => {
            let field = field.field_info();
            match multiple {
                Some(count) => {
                    let options = MultipleOptions {
                        context: note,
                        ..MultipleOptions::default()
                    };
                    let results = generator.generate_multiple(&field, count, options).await?;
                    if results.is_empty() {
                        return Err(Error::GenerationFailed(format!(
                            "all {} variants failed",
                            count
                        ))
                        .into());
                    }
                    serde_json::to_value(results)?
                }
                None => {
                    let options = GenerateOptions {
                        use_cache: !no_cache,
                        force_regenerate: force,
                        return_multiple: random,
                        context: note,
                        creativity_level: creativity,
                        ..GenerateOptions::default()
                    };
                    serde_json::to_value(generator.generate_for_field(&field, options).await?)?
                }
            }
        }

        Command::Suggest { field, limit } => {
            let suggestions = generator
                .get_suggestions(&field.field_info(), limit)
                .await?;
            serde_json::to_value(suggestions)?
        }

        Command::Stats => serde_json::to_value(generator.get_cache_stats().await?)?,

        Command::Clear => {
            generator.clear_cache().await?;
            success()
        }

        Command::Cleanup => serde_json::to_value(generator.cleanup().await?)?,

        Command::TestConnection { provider } => {
            let ok = generator.test_connection(&provider).await;
            json!({ "provider": provider, "success": ok })
        }

        Command::Providers => providers(&app).await?,

        Command::Models { provider } => {
            let models = generator.providers().list_models(&provider).await?;
            json!({ "provider": provider, "models": models })
        }

        Command::SetKey {
            provider,
            key,
            force,
        } => {
            ensure_known(&app, &provider)?;
            if let Err(problem) = validate_api_key(&provider, &key) {
                if !force {
                    bail!("{} (use --force to store it anyway)", problem);
                }
            }
            app.credentials.set_api_key(&provider, &key)?;
            info!("Stored API key for {}", provider);
            success()
        }

        Command::RemoveKey { provider } => {
            app.credentials.remove_api_key(&provider)?;
            success()
        }

        Command::Use { provider } => {
            ensure_known(&app, &provider)?;
            let mut settings = stored_settings(&app)?;
            settings.current_provider = provider;
            app.settings.save(&settings)?;
            serde_json::to_value(settings)?
        }

        Command::Settings => serde_json::to_value(generator.providers().settings().await?)?,

        Command::Presets => presets(),

        Command::Maintain { interval_secs } => {
            if interval_secs == 0 {
                bail!("--interval-secs must be at least 1");
            }
            let task = MaintenanceTask::spawn(
                std::sync::Arc::clone(generator),
                Duration::from_secs(interval_secs),
            );
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            let last = task.last_report();
            task.stop();
            json!({ "success": true, "lastReport": last })
        }
    };

    Ok(output)
}

/// Settings as written on disk, without environment overrides
fn stored_settings(app: &App) -> anyhow::Result<Settings> {
    Ok(app
        .settings
        .store()
        .load_optional::<Settings>(SETTINGS_FILE)?
        .unwrap_or_default())
}

fn ensure_known(app: &App, provider: &str) -> anyhow::Result<()> {
    let registry = app.generator.providers().registry();
    if !registry.contains(provider) {
        bail!(
            "Unknown provider '{}' (expected one of: {})",
            provider,
            registry.names().join(", ")
        );
    }
    Ok(())
}

async fn providers(app: &App) -> anyhow::Result<Value> {
    let manager = app.generator.providers();
    let settings = manager.settings().await?;

    let mut rows = Vec::new();
    for id in manager.registry().names() {
        let configured = manager.get_provider(&id).await?.is_some();
        let provider = settings.provider(&id);
        rows.push(json!({
            "id": id,
            "name": provider.map(|p| p.name.clone()),
            "current": settings.current_provider == id,
            "local": ProviderKind::from_id(&id).is_some_and(|kind| kind.is_local()),
            "configured": configured,
            "model": provider.map(|p| p.default_model.clone()),
            "baseUrl": provider.map(|p| p.base_url.clone()),
        }));
    }
    Ok(Value::Array(rows))
}

fn presets() -> Value {
    let rows = CreativityPreset::ALL
        .iter()
        .map(|preset| {
            json!({
                "name": preset.name(),
                "temperature": preset.temperature(),
                "label": temperature_label(preset.temperature()),
                "description": preset.description(),
            })
        })
        .collect();
    Value::Array(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn args(dir: &TempDir, rest: &[&str]) -> Args {
        let config = dir.path().join("config");
        let cache = dir.path().join("cache.db");
        let mut argv = vec![
            "fillo".to_string(),
            "--config-dir".to_string(),
            config.display().to_string(),
            "--cache-db".to_string(),
            cache.display().to_string(),
        ];
        argv.extend(rest.iter().map(|s| s.to_string()));
        Args::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn test_stats_on_fresh_cache() {
        let dir = TempDir::new().unwrap();
        let stats = run(args(&dir, &["stats"])).await.unwrap();
        assert_eq!(stats["totalEntries"], 0);
        assert_eq!(stats["hitRate"], 0.0);
    }

    #[tokio::test]
    async fn test_suggest_empty_cache() {
        let dir = TempDir::new().unwrap();
        let out = run(args(
            &dir,
            &["suggest", "--type", "email", "--label", "Email", "--context", "Signup"],
        ))
        .await
        .unwrap();
        assert_eq!(out, json!([]));
    }

    #[tokio::test]
    async fn test_set_key_rejects_malformed() {
        let dir = TempDir::new().unwrap();
        let err = run(args(&dir, &["set-key", "openai", "nope"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--force"));

        let out = run(args(&dir, &["set-key", "openai", "nope", "--force"]))
            .await
            .unwrap();
        assert_eq!(out, success());
        assert!(dir.path().join("config").join("credentials.json").exists());
    }

    #[tokio::test]
    async fn test_use_switches_provider() {
        let dir = TempDir::new().unwrap();
        let out = run(args(&dir, &["use", "anthropic"])).await.unwrap();
        assert_eq!(out["currentProvider"], "anthropic");
        assert!(dir.path().join("config").join("settings.json").exists());

        let err = run(args(&dir, &["use", "groq"])).await.unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[tokio::test]
    async fn test_clear_and_cleanup() {
        let dir = TempDir::new().unwrap();
        assert_eq!(run(args(&dir, &["clear"])).await.unwrap(), success());
        let report = run(args(&dir, &["cleanup"])).await.unwrap();
        assert_eq!(report["expiredRemoved"], 0);
        assert_eq!(report["evicted"], 0);
    }

    #[test]
    fn test_failure_body() {
        let body = failure(&anyhow::anyhow!("No provider configured"));
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "No provider configured");
    }

    #[test]
    fn test_failure_keeps_cause_chain() {
        let err = anyhow::anyhow!("disk full").context("Failed to open Fillo storage");
        let body = failure(&err);
        assert_eq!(body["error"], "Failed to open Fillo storage: disk full");
    }

    #[tokio::test]
    async fn test_unopenable_cache_reports_cause() {
        let dir = TempDir::new().unwrap();
        // 캐시 경로의 부모가 파일이라 열 수 없다
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let cache = blocker.join("cache.db");
        let argv = vec![
            "fillo".to_string(),
            "--config-dir".to_string(),
            dir.path().join("config").display().to_string(),
            "--cache-db".to_string(),
            cache.display().to_string(),
            "stats".to_string(),
        ];

        let err = run(Args::try_parse_from(argv).unwrap()).await.unwrap_err();
        let message = failure(&err)["error"].as_str().unwrap().to_string();
        assert!(message.starts_with("Failed to open Fillo storage: "));
        assert!(message.len() > "Failed to open Fillo storage: ".len());
    }

    #[tokio::test]
    async fn test_providers_marks_local() {
        let dir = TempDir::new().unwrap();
        let rows = run(args(&dir, &["providers"])).await.unwrap();
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 4);
        for row in rows {
            assert_eq!(row["local"], row["id"] == "ollama", "{}", row);
        }
    }

    #[tokio::test]
    async fn test_presets_listing() {
        let dir = TempDir::new().unwrap();
        let out = run(args(&dir, &["presets"])).await.unwrap();
        assert_eq!(out[0]["name"], "Predictable");
        assert_eq!(out[0]["label"], "Very Predictable");
        assert_eq!(out[1]["description"], "Good mix of accuracy and variation");
        assert_eq!(out[3]["temperature"], 1.5);
    }
}

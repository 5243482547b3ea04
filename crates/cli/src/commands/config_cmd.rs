//! `switchyard config` — Configuration management commands.

use switchyard_config::AppConfig;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let warnings = warnings(&config);
            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Provider:   {}", config.default_provider);
            println!("   Model:      {}", config.default_model);
            println!(
                "   CRM model:  {}",
                config.models.crm_orchestrator.as_deref().unwrap_or(&config.default_model)
            );
            println!(
                "   CRM:        extension '{}' → {}",
                config.crm.extension_id,
                config.crm.gateway_url.as_deref().unwrap_or("(no gateway)")
            );
            println!(
                "   Images:     {} ({}), composer {}",
                config.images.model,
                config.images.size,
                config.images.composer_url.as_deref().unwrap_or("(disabled)")
            );
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

/// Non-fatal problems worth telling the user about.
fn warnings(config: &AppConfig) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    if config.api_key.is_none() && config.providers.values().all(|p| p.api_key.is_none()) {
        warnings.push("No API key set (set SWITCHYARD_API_KEY, OPENROUTER_API_KEY or OPENAI_API_KEY)");
    }
    if config.crm.gateway_url.is_none() {
        warnings.push("No CRM gateway URL; CRM threads will answer with a gateway error notice");
    }
    if config.images.composer_url.is_none() {
        warnings.push("No image composer URL; edit_image_text will not be offered");
    }
    warnings
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let mut shown = config.clone();
    if shown.api_key.is_some() {
        shown.api_key = Some("[REDACTED]".into());
    }
    for provider in shown.providers.values_mut() {
        if provider.api_key.is_some() {
            provider.api_key = Some("[REDACTED]".into());
        }
    }
    let toml_str = toml::to_string_pretty(&shown)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}

pub async fn default() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", AppConfig::default_toml());
    Ok(())
}

//! Prints the parameter dictionary of a Yamcs instance.

use anyhow::Result;
use lib_yamcs::config;
use lib_yamcs::mdb::cache::DictionaryCache;
use lib_yamcs::mdb::dictionary::EngType;
use lib_yamcs::rest::RestClient;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config();
    lib_yamcs::logger::setup_logging(config.log_dir.as_deref(), config.log_level())?;

    let rest = Arc::new(RestClient::new(&config)?);
    let cache = DictionaryCache::new(rest, config.instance());
    let dictionary = cache.load().await?;

    println!("{} parameters in instance `{}`:", dictionary.len(), config.instance());
    for parameter in dictionary.iter() {
        let eng_type = match &parameter.eng_type {
            Some(EngType::Other(tag)) => tag.clone(),
            Some(t) => format!("{t:?}").to_lowercase(),
            None => "-".to_string(),
        };
        println!("  {:<30} {:<12} {}", parameter.name, eng_type, parameter.qualified_name);
    }
    Ok(())
}

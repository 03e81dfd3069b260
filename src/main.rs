// src/main.rs
use annotation_xml::utils::export_processor::run_export_directory;
use annotation_xml::ExportConfig;
use log::info;
use std::fs;
use std::path::Path;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let data_dir = Path::new("./data");
    let config_path = data_dir.join("config.yml");
    if !config_path.exists() {
        println!("No data/config.yml found. Place the hook configuration and annotation .json files in data/.");
        return Ok(());
    }

    let config = ExportConfig::from_yaml_str(&fs::read_to_string(&config_path)?)?;
    info!("Loaded configuration with root <{}>", config.xml.root);

    let written = run_export_directory(data_dir, &config)?;
    println!("✅ Exported {} annotations to XML", written);

    Ok(())
}

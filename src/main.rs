use anyhow::Result;
use sheetpilot::models::load_profile;
use sheetpilot::utils::logging;
use sheetpilot::{import_folder, App, Config, Store};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::from_env();
    let profile = load_profile(config.profile_path_buf().as_deref()).await?;
    let store = Store::open(&config.db_path)?;

    // 先导入新的条目文件
    if let Some(folder) = config.import_folder.as_deref() {
        import_folder(&store, folder).await?;
    }

    // 初始化并运行应用
    let _summary = App::initialize(config, profile, store).await?.run().await?;

    Ok(())
}

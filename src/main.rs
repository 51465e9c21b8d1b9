use std::env;

use users_schema::infrastructure::{Config, Logger};
use users_schema::schema::ddl;
use users_schema::users_table;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    Logger::init(&config.logging);

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("ddl");

    match command {
        "ddl" => println!("{};", ddl::create_table_sql(users_table())),
        "json" => println!("{}", ddl::to_json(users_table())?),
        "apply" => apply(&config).await?,
        _ => print_usage(),
    }

    Ok(())
}

#[cfg(feature = "database")]
async fn apply(config: &Config) -> anyhow::Result<()> {
    use users_schema::infrastructure::DatabaseManager;

    let db = DatabaseManager::new(&config.database).await?;
    db.apply_schema(users_table()).await?;
    Ok(())
}

#[cfg(not(feature = "database"))]
async fn apply(_config: &Config) -> anyhow::Result<()> {
    anyhow::bail!("built without the `database` feature")
}

fn print_usage() {
    println!("用法: users_schema [ddl|json|apply]");
    println!();
    println!("  ddl    - 输出建表语句（默认）");
    println!("  json   - 输出表声明的 JSON 快照");
    println!("  apply  - 在配置的数据库中建表");
}

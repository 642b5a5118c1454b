use std::{env, sync::LazyLock};

pub static ECONYA_HOST: LazyLock<String> =
    LazyLock::new(|| env::var("ECONYA_HOST").unwrap_or("0.0.0.0".into()));
pub static ECONYA_PORT: LazyLock<String> =
    LazyLock::new(|| env::var("PORT").unwrap_or("3000".into()));
pub static ECONYA_ADDR: LazyLock<String> =
    LazyLock::new(|| format!("{}:{}", *ECONYA_HOST, *ECONYA_PORT));

pub static ECONYA_DATA_DIR: LazyLock<String> =
    LazyLock::new(|| env::var("ECONYA_DATA_DIR").unwrap_or("data".into()));

pub static ECONYA_PUBLIC_BASE: LazyLock<String> = LazyLock::new(|| {
    env::var("PUBLIC_BASE").unwrap_or("https://econya-backend.onrender.com".into())
});
pub static ECONYA_PUBLIC_SITE: LazyLock<String> =
    LazyLock::new(|| env::var("PUBLIC_SITE").unwrap_or("https://econya.fr".into()));

pub fn bootstrap() {
    LazyLock::force(&ECONYA_HOST);
    LazyLock::force(&ECONYA_PORT);
    LazyLock::force(&ECONYA_ADDR);
    LazyLock::force(&ECONYA_DATA_DIR);
    LazyLock::force(&ECONYA_PUBLIC_BASE);
    LazyLock::force(&ECONYA_PUBLIC_SITE);
}

pub const VERSION: &str = env!("BUILD_VERSION");

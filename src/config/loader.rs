//! 配置加载器实现
//!
//! 提供TOML配置文件解析、环境变量替换和错误处理功能

use crate::config::types::{validate_config, Config};
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};

/// 配置文件名
pub const CONFIG_FILE_NAME: &str = "url-vitals.toml";

/// 配置加载器trait，定义配置加载接口
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// 从文件加载配置
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    ///
    /// # 返回
    /// * `Result<Config>` - 加载的配置或错误
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config>;

    /// 从字符串加载配置
    async fn load_from_string(&self, content: &str) -> Result<Config>;

    /// 验证配置
    fn validate(&self, config: &Config) -> Result<()>;
}

/// TOML配置加载器实现
#[derive(Debug, Clone)]
pub struct TomlConfigLoader {
    /// 是否启用环境变量替换
    enable_env_substitution: bool,
}

impl TomlConfigLoader {
    /// 创建新的TOML配置加载器
    ///
    /// # 参数
    /// * `enable_env_substitution` - 是否启用环境变量替换
    pub fn new(enable_env_substitution: bool) -> Self {
        Self {
            enable_env_substitution,
        }
    }

    /// 替换字符串中的环境变量，缺失的变量会返回错误
    fn substitute_env_vars(&self, content: &str) -> Result<String> {
        if !self.enable_env_substitution {
            return Ok(content.to_string());
        }

        // 匹配 ${VAR_NAME} 格式的环境变量
        let env_var_regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
            .map_err(|e| ConfigError::ParseError(format!("正则表达式错误: {}", e)))?;

        let mut result = content.to_string();

        for captures in env_var_regex.captures_iter(content) {
            let full_match = &captures[0];
            let var_name = &captures[1];

            match std::env::var(var_name) {
                Ok(value) => {
                    result = result.replace(full_match, &value);
                }
                Err(_) => {
                    return Err(ConfigError::EnvVarError {
                        var: var_name.to_string(),
                    }
                    .into());
                }
            }
        }

        Ok(result)
    }

    fn parse_toml(&self, content: &str) -> Result<Config> {
        let processed_content = self.substitute_env_vars(content)?;

        let config: Config = toml::from_str(&processed_content)
            .map_err(|e| ConfigError::ParseError(format!("TOML解析失败: {}", e)))?;

        Ok(config)
    }
}

impl Default for TomlConfigLoader {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl ConfigLoader for TomlConfigLoader {
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            }
            .into());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::ParseError(format!("读取文件失败: {}", e)))?;

        let config = self.parse_toml(&content)?;
        self.validate(&config)?;

        log::debug!("成功加载配置文件: {}", path.display());
        log::debug!("配置内容: {:?}", config);

        Ok(config)
    }

    async fn load_from_string(&self, content: &str) -> Result<Config> {
        let config = self.parse_toml(content)?;
        self.validate(&config)?;

        log::debug!("成功解析配置字符串");

        Ok(config)
    }

    fn validate(&self, config: &Config) -> Result<()> {
        validate_config(config).map_err(|e| ConfigError::ValidationError(e).into())
    }
}

/// 获取默认配置文件路径
///
/// 优先使用当前目录下的 `url-vitals.toml`，否则使用用户配置目录。
pub fn get_default_config_path() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }

    dirs::config_dir()
        .map(|config_dir| config_dir.join("url-vitals").join("config.toml"))
        .unwrap_or(local)
}

/// 加载配置：显式指定的路径必须存在，默认路径不存在时使用内置默认值
///
/// # 返回
/// * `Result<(Config, Option<PathBuf>)>` - 配置以及实际读取的文件路径，使用内置默认值时路径为 `None`
pub async fn load_or_default(explicit: Option<&Path>) -> Result<(Config, Option<PathBuf>)> {
    let loader = TomlConfigLoader::default();

    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = get_default_config_path();
            if !path.exists() {
                return Ok((Config::default(), None));
            }
            path
        }
    };

    let config = loader.load_from_file(&path).await?;
    Ok((config, Some(path)))
}

/// 生成带注释的默认配置文件内容
pub fn default_config_template() -> String {
    format!(
        r#"# url-vitals 配置文件
# 字符串值支持环境变量替换

[global]
# 日志级别: trace, debug, info, warn, error
log_level = "info"
json_logs = false
# 日志文件路径，设置后日志写入该文件而不是标准错误
# log_file = "url-vitals.log"

[checker]
# 最大并发探测数
concurrency = 20
# 单次探测超时时间（毫秒）
timeout_ms = 10000
# 探测方法: "get"（不读取响应体）或 "head"
method = "get"
user_agent = "{}"
follow_redirects = true
max_redirects = 10

[checker.headers]
"Accept" = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
"Accept-Language" = "en-US,en;q=0.9"

[web]
bind_address = "127.0.0.1"
port = 5000
cors_enabled = true
max_batch_size = 10000
"#,
        crate::config::types::DEFAULT_USER_AGENT
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::ProbeMethod;
    use serial_test::serial;
    use std::env;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TEST_CONFIG_TOML: &str = r#"
[global]
log_level = "debug"
log_file = "/var/log/url-vitals.log"

[checker]
concurrency = 8
timeout_ms = 2500
method = "head"
follow_redirects = false

[checker.headers]
"X-Probe" = "1"

[web]
port = 8088
"#;

    const TEST_CONFIG_WITH_ENV_VARS: &str = r#"
[checker]
user_agent = "${PROBE_AGENT}"

[checker.headers]
"Authorization" = "Bearer ${PROBE_TOKEN}"
"#;

    #[tokio::test]
    async fn test_toml_parsing() {
        let loader = TomlConfigLoader::new(false);
        let config = loader.load_from_string(TEST_CONFIG_TOML).await.unwrap();

        assert_eq!(config.global.log_level, "debug");
        assert_eq!(
            config.global.log_file.as_deref(),
            Some(Path::new("/var/log/url-vitals.log"))
        );
        assert_eq!(config.checker.concurrency, 8);
        assert_eq!(config.checker.timeout_ms, 2500);
        assert_eq!(config.checker.method, ProbeMethod::Head);
        assert!(!config.checker.follow_redirects);
        assert_eq!(config.checker.headers.get("X-Probe"), Some(&"1".to_string()));
        assert_eq!(config.web.port, 8088);
        assert_eq!(config.web.bind_address, "127.0.0.1");
    }

    #[tokio::test]
    #[serial]
    async fn test_env_var_substitution() {
        env::set_var("PROBE_AGENT", "vitals-test/1.0");
        env::set_var("PROBE_TOKEN", "test-token-123");

        let loader = TomlConfigLoader::new(true);
        let config = loader
            .load_from_string(TEST_CONFIG_WITH_ENV_VARS)
            .await
            .unwrap();

        assert_eq!(config.checker.user_agent, "vitals-test/1.0");
        assert_eq!(
            config.checker.headers.get("Authorization"),
            Some(&"Bearer test-token-123".to_string())
        );

        env::remove_var("PROBE_AGENT");
        env::remove_var("PROBE_TOKEN");
    }

    #[tokio::test]
    #[serial]
    async fn test_env_var_substitution_missing_var() {
        let config_with_missing_var = r#"
[checker]
user_agent = "${URL_VITALS_MISSING_VAR}"
"#;

        let loader = TomlConfigLoader::new(true);
        let result = loader.load_from_string(config_with_missing_var).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("URL_VITALS_MISSING_VAR"));
    }

    #[test]
    fn test_substitute_env_vars_disabled() {
        let loader = TomlConfigLoader::new(false);
        let content = "test ${VAR} content";
        let result = loader.substitute_env_vars(content).unwrap();
        assert_eq!(result, content);
    }

    #[tokio::test]
    async fn test_validation_failure_is_reported() {
        let loader = TomlConfigLoader::new(false);
        let result = loader
            .load_from_string("[checker]\nconcurrency = 0\n")
            .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("并发数"));
    }

    #[tokio::test]
    async fn test_load_from_missing_file() {
        let loader = TomlConfigLoader::new(false);
        let result = loader.load_from_file("/nonexistent/url-vitals.toml").await;

        assert!(matches!(
            result,
            Err(crate::error::UrlVitalsError::Config(ConfigError::FileNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_default_template_round_trips() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(default_config_template().as_bytes()).unwrap();

        let (config, source) = load_or_default(Some(file.path())).await.unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(source.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_get_default_config_path() {
        let path = get_default_config_path();
        assert!(path.to_string_lossy().contains("url-vitals"));
    }
}

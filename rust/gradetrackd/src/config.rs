use std::path::PathBuf;

pub const DATA_DIR_ENV: &str = "GRADETRACK_DATA_DIR";
pub const DEFAULT_NAMESPACE: &str = "grade-tracker";
pub const DEFAULT_GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const LOCAL_DB_FILE_NAME: &str = "local.sqlite3";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    /// Prefix of every local key, e.g. `grade-tracker:semesters:v1`.
    pub namespace: String,
    pub log_json: bool,
    pub groq_api_url: String,
    pub groq_api_key: Option<String>,
    pub ai_model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            log_json: false,
            groq_api_url: DEFAULT_GROQ_API_URL.to_string(),
            groq_api_key: None,
            ai_model: crate::outline::DEFAULT_MODEL.to_string(),
        }
    }
}

impl Config {
    /// Reads `GRADETRACK_*` / `GROQ_*` variables. Call `dotenvy::dotenv()`
    /// first if a `.env` file should be honoured.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_dir: env_nonempty(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            namespace: env_nonempty("GRADETRACK_NAMESPACE").unwrap_or(defaults.namespace),
            log_json: env_nonempty("GRADETRACK_LOG_JSON")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.log_json),
            groq_api_url: env_nonempty("GROQ_API_URL").unwrap_or(defaults.groq_api_url),
            groq_api_key: env_nonempty("GROQ_API_KEY"),
            ai_model: env_nonempty("GRADETRACK_AI_MODEL").unwrap_or(defaults.ai_model),
        }
    }

    pub fn local_db_path(&self) -> PathBuf {
        self.data_dir.join(LOCAL_DB_FILE_NAME)
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("gradetrack"))
        .unwrap_or_else(|| PathBuf::from("gradetrack-data"))
}

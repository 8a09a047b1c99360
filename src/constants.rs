pub const FAILURE_THRESHOLD: u32 = 5;
pub const CREDENTIAL_PREFIX: &str = "gsk_";

pub const IDEOGRAPH_FIRST: char = '\u{4E00}';
pub const IDEOGRAPH_LAST: char = '\u{9FFF}';

pub const APP_DIR_NAME: &str = "kangkang";
pub const CONFIG_FILE: &str = "config.json";
pub const SETTINGS_FILE: &str = "settings.json";
pub const LOG_FILE_PREFIX: &str = "kangkang.log";

pub const DEFAULT_HOTKEY_TRANSLATE: &str = "CommandOrControl+D";
pub const DEFAULT_HOTKEY_REPAIR: &str = "CommandOrControl+Alt+K";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";

pub const CONNECT_TIMEOUT_MS_DEFAULT: u64 = 5_000;
pub const READ_TIMEOUT_MS_DEFAULT: u64 = 15_000;
pub const CONNECT_TIMEOUT_MS_RANGE: (u64, u64) = (1_000, 30_000);
pub const READ_TIMEOUT_MS_RANGE: (u64, u64) = (3_000, 60_000);

pub const SYSTEM_PROMPT: &str = "Dịch Trung ↔ Việt. Không giải thích.";
pub const USER_PROMPT_TO_CHINESE: &str = "Dịch sang tiếng Trung:";
pub const USER_PROMPT_TO_VIETNAMESE: &str = "Dịch sang tiếng Việt:";

pub const MSG_TRANSLATION_FAILED: &str = "❌ Bảo Bối AI lỗi dùi khum dịch đượt";
pub const MSG_INVALID_KEY_FORMAT: &str = "❌ API key phải bắt đầu bằng gsk_";
pub const MSG_KEY_SAVE_FAILED: &str = "❌ Không lưu được API key";
pub const MSG_KEY_SAVED: &str = "✅ Bảo Bối Save API key okela dùi";

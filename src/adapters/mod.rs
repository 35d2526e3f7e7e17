// Adapters layer: concrete implementations of the domain ports (SEC, Yahoo, OpenAI, MySQL, local files)

pub mod article;
pub mod edgar;
pub mod mysql;
pub mod openai;
pub mod storage;
pub mod yahoo;

pub use edgar::EdgarClient;
pub use mysql::MySqlRepository;
pub use openai::OpenAiClient;
pub use storage::LocalStorage;
pub use yahoo::YahooNewsClient;

use names::Generator;
use once_cell::sync::Lazy;

/// The MongoDB server the tests run against, from `TEST_DATABASE_URL`.
pub static CONN_STR: Lazy<Option<String>> = Lazy::new(|| std::env::var("TEST_DATABASE_URL").ok());

/// A fresh database name, so tests do not see each other's collections.
pub fn generate_database_name() -> String {
    let mut names = Generator::default();

    names.next().unwrap().replace('-', "")
}

/// `conn_str` pointed at `database_name`, keeping its query parameters.
pub fn connection_string_for(conn_str: &str, database_name: &str) -> String {
    let mut connection_string: url::Url = conn_str.parse().unwrap();
    connection_string.set_path(&format!("/{database_name}"));

    connection_string.to_string()
}

//! Statement builders for each dialect.
//!
//! Identifiers are quoted with backticks (both dialects accept them) and
//! every value is bound as a parameter.

use super::{SqlDialect, Statement};

pub(crate) fn quote_ident(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

pub(crate) fn create_table(dialect: SqlDialect, table: &str, unique_value: bool) -> Statement {
    let table = quote_ident(table);
    let sql = match (dialect, unique_value) {
        (SqlDialect::MySql, false) => format!(
            "CREATE TABLE IF NOT EXISTS {table} (`key` VARCHAR(255) NOT NULL PRIMARY KEY, `value` LONGTEXT)"
        ),
        (SqlDialect::MySql, true) => format!(
            "CREATE TABLE IF NOT EXISTS {table} (`key` VARCHAR(255) NOT NULL PRIMARY KEY, `value` LONGTEXT, UNIQUE KEY `value_unique` (`value`(255)))"
        ),
        (SqlDialect::Sqlite, false) => format!(
            "CREATE TABLE IF NOT EXISTS {table} (`key` TEXT NOT NULL PRIMARY KEY, `value` TEXT)"
        ),
        (SqlDialect::Sqlite, true) => format!(
            "CREATE TABLE IF NOT EXISTS {table} (`key` TEXT NOT NULL PRIMARY KEY, `value` TEXT UNIQUE)"
        ),
    };
    Statement::new(sql)
}

pub(crate) fn select_all(table: &str) -> Statement {
    Statement::new(format!("SELECT `key`, `value` FROM {}", quote_ident(table)))
}

pub(crate) fn select_key(table: &str, row_key: &str) -> Statement {
    Statement::new(format!(
        "SELECT `key` FROM {} WHERE `key` = ?",
        quote_ident(table)
    ))
    .bind(row_key)
}

pub(crate) fn update(table: &str, row_key: &str, payload: &str) -> Statement {
    Statement::new(format!(
        "UPDATE {} SET `value` = ? WHERE `key` = ?",
        quote_ident(table)
    ))
    .bind(payload)
    .bind(row_key)
}

pub(crate) fn insert(dialect: SqlDialect, table: &str, row_key: &str, payload: &str) -> Statement {
    let verb = match dialect {
        SqlDialect::MySql => "INSERT IGNORE",
        SqlDialect::Sqlite => "INSERT OR IGNORE",
    };
    Statement::new(format!(
        "{verb} INTO {} (`key`, `value`) VALUES (?, ?)",
        quote_ident(table)
    ))
    .bind(row_key)
    .bind(payload)
}

pub(crate) fn delete_row(table: &str, row_key: &str) -> Statement {
    Statement::new(format!("DELETE FROM {} WHERE `key` = ?", quote_ident(table))).bind(row_key)
}

pub(crate) fn drop_table(table: &str) -> Statement {
    Statement::new(format!("DROP TABLE IF EXISTS {}", quote_ident(table)))
}

pub(crate) fn list_tables(dialect: SqlDialect) -> Statement {
    match dialect {
        SqlDialect::MySql => Statement::new("SHOW TABLES"),
        SqlDialect::Sqlite => Statement::new(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY rowid",
        ),
    }
}

pub(crate) fn table_exists(dialect: SqlDialect, table: &str) -> Statement {
    let sql = match dialect {
        SqlDialect::MySql => {
            "SELECT table_name FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = ?"
        }
        SqlDialect::Sqlite => "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
    };
    Statement::new(sql).bind(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idents_are_escaped() {
        assert_eq!(quote_ident("scores"), "`scores`");
        assert_eq!(quote_ident("a`b"), "`a``b`");
    }

    #[test]
    fn insert_per_dialect() {
        let mysql = insert(SqlDialect::MySql, "t", "fp_0", "{}");
        assert!(mysql.sql.starts_with("INSERT IGNORE INTO `t`"));
        assert_eq!(mysql.params, ["fp_0", "{}"]);

        let sqlite = insert(SqlDialect::Sqlite, "t", "fp_0", "{}");
        assert!(sqlite.sql.starts_with("INSERT OR IGNORE INTO `t`"));
    }

    #[test]
    fn update_binds_payload_first() {
        let stmt = update("t", "fp_1", "body");
        assert_eq!(stmt.sql, "UPDATE `t` SET `value` = ? WHERE `key` = ?");
        assert_eq!(stmt.params, ["body", "fp_1"]);
    }

    #[test]
    fn create_table_variants() {
        let plain = create_table(SqlDialect::Sqlite, "t", false);
        assert!(plain.sql.starts_with("CREATE TABLE IF NOT EXISTS `t`"));
        assert!(!plain.sql.contains("UNIQUE"));

        assert!(create_table(SqlDialect::Sqlite, "t", true).sql.contains("UNIQUE"));
        assert!(create_table(SqlDialect::MySql, "t", true).sql.contains("UNIQUE KEY"));
        assert!(create_table(SqlDialect::MySql, "t", false).sql.contains("LONGTEXT"));
    }

    #[test]
    fn list_tables_per_dialect() {
        assert_eq!(list_tables(SqlDialect::MySql).sql, "SHOW TABLES");
        assert!(list_tables(SqlDialect::Sqlite).sql.contains("sqlite_master"));
    }
}

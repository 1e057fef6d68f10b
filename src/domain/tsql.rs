// SPDX-License-Identifier: MIT OR Apache-2.0

//! T-SQL statements issued by the clone pipeline.
//!
//! Identifiers are bracket-quoted and literals are N-quoted with embedded
//! quotes doubled, so database names and paths from configuration cannot
//! break out of the statement.

/// Quotes an identifier: `Orders]x` becomes `[Orders]]x]`.
pub fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Quotes a Unicode string literal: `O'Brien` becomes `N'O''Brien'`.
pub fn quote_literal(value: &str) -> String {
    format!("N'{}'", value.replace('\'', "''"))
}

/// Full copy-only backup of `database` to `path`.
pub fn backup_database(database: &str, path: &str) -> String {
    format!(
        "BACKUP DATABASE {} TO DISK = {} WITH COPY_ONLY, INIT",
        quote_ident(database),
        quote_literal(path)
    )
}

/// Lists the files inside the backup at `path`.
pub fn file_list_only(path: &str) -> String {
    format!("RESTORE FILELISTONLY FROM DISK = {}", quote_literal(path))
}

/// Default data and log folders of the instance.
pub const SERVER_PATHS_QUERY: &str = "SELECT CAST(SERVERPROPERTY('InstanceDefaultDataPath') AS nvarchar(4000)) AS DataPath, CAST(SERVERPROPERTY('InstanceDefaultLogPath') AS nvarchar(4000)) AS LogPath";

/// Forces `database` into single-user mode, rolling back other sessions.
/// A no-op when the database does not exist yet.
pub fn set_single_user(database: &str) -> String {
    format!(
        "IF DB_ID({}) IS NOT NULL ALTER DATABASE {} SET SINGLE_USER WITH ROLLBACK IMMEDIATE",
        quote_literal(database),
        quote_ident(database)
    )
}

/// Restores `database` from `backup_path`, moving each logical file to its
/// physical path and replacing any existing database.
pub fn restore_with_move(database: &str, backup_path: &str, moves: &[(String, String)]) -> String {
    let mut statement = format!(
        "RESTORE DATABASE {} FROM DISK = {} WITH ",
        quote_ident(database),
        quote_literal(backup_path)
    );
    for (logical, physical) in moves {
        statement.push_str(&format!(
            "MOVE {} TO {}, ",
            quote_literal(logical),
            quote_literal(physical)
        ));
    }
    statement.push_str("REPLACE");
    statement
}

/// Renames a logical file of `database`.
pub fn rename_logical_file(database: &str, old_name: &str, new_name: &str) -> String {
    format!(
        "ALTER DATABASE {} MODIFY FILE (NAME = {}, NEWNAME = {})",
        quote_ident(database),
        quote_literal(old_name),
        quote_literal(new_name)
    )
}

/// Brings `database` online.
pub fn set_online(database: &str) -> String {
    format!("ALTER DATABASE {} SET ONLINE", quote_ident(database))
}

/// Returns `database` to multi-user mode.
pub fn set_multi_user(database: &str) -> String {
    format!("ALTER DATABASE {} SET MULTI_USER", quote_ident(database))
}

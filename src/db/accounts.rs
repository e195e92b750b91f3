//! Account table queries.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Result, Row};

use crate::auth::password::StoredCredential;
use crate::domain::{Account, ContactNumber, Role, SealedAadhar};

const ACCOUNT_COLUMNS: &str = "id, role, full_name, contact_number, aadhar_sealed, date_of_birth, \
                               password_hash, created_at, profile_image";

/// Column values for a new account row
pub struct AccountRow<'a> {
    pub role: Role,
    pub full_name: &'a str,
    pub contact_number: &'a ContactNumber,
    pub aadhar: &'a SealedAadhar,
    pub date_of_birth: NaiveDate,
    pub password_hash: &'a StoredCredential,
    pub created_at: DateTime<Utc>,
}

/// Fixed-width timestamp so that text ordering is chronological
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_date(idx: usize, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn account_from_row(row: &Row<'_>) -> Result<Account> {
    let date_of_birth: String = row.get(5)?;
    let created_at: String = row.get(7)?;
    Ok(Account {
        id: row.get(0)?,
        role: row.get(1)?,
        full_name: row.get(2)?,
        contact_number: row.get(3)?,
        aadhar: SealedAadhar(row.get(4)?),
        date_of_birth: parse_date(5, &date_of_birth)?,
        password_hash: row.get(6)?,
        created_at: parse_timestamp(7, &created_at)?,
        profile_image: row.get(8)?,
    })
}

/// Insert an account, returns the new account ID
pub fn insert_account(conn: &Connection, account: &AccountRow<'_>) -> Result<i64> {
    conn.execute(
        r#"INSERT INTO accounts
           (role, full_name, contact_number, aadhar_sealed, date_of_birth, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
        params![
            account.role,
            account.full_name,
            account.contact_number,
            account.aadhar.0,
            account.date_of_birth.format("%Y-%m-%d").to_string(),
            account.password_hash,
            format_timestamp(account.created_at),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// All accounts sharing a contact number, newest first
pub fn find_by_contact(conn: &Connection, contact: &ContactNumber) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM accounts WHERE contact_number = ?1 ORDER BY created_at DESC, id DESC",
        ACCOUNT_COLUMNS
    ))?;
    let accounts = stmt
        .query_map(params![contact], account_from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(accounts)
}

/// Get an account by ID
pub fn get_account(conn: &Connection, id: i64) -> Result<Option<Account>> {
    conn.query_row(
        &format!("SELECT {} FROM accounts WHERE id = ?1", ACCOUNT_COLUMNS),
        params![id],
        account_from_row,
    )
    .optional()
}

/// Check if any account uses a contact number
pub fn contact_exists(conn: &Connection, contact: &ContactNumber) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM accounts WHERE contact_number = ?1",
        params![contact],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Record a new profile image path; false if the account does not exist
/// Record (or with `None`, clear) the account's profile image path
pub fn set_profile_image(conn: &Connection, id: i64, path: Option<&str>) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE accounts SET profile_image = ?1 WHERE id = ?2",
        params![path, id],
    )?;
    Ok(updated > 0)
}

pub fn count_accounts(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::{hash_password, PlainPassword};
    use chrono::Duration;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::run_migrations(&conn).unwrap();
        conn
    }

    fn insert(conn: &Connection, contact: &str, name: &str, at: DateTime<Utc>) -> i64 {
        let contact = ContactNumber::parse(contact).unwrap();
        let credential = hash_password(&PlainPassword::new("secret1")).unwrap();
        let sealed = SealedAadhar("00".to_string());
        insert_account(
            conn,
            &AccountRow {
                role: Role::FlatOwner,
                full_name: name,
                contact_number: &contact,
                aadhar: &sealed,
                date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
                password_hash: &credential,
                created_at: at,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let conn = setup();
        let now = Utc::now();
        let id = insert(&conn, "9876543210", "Anil Joshi", now);

        let account = get_account(&conn, id).unwrap().unwrap();
        assert_eq!(account.full_name, "Anil Joshi");
        assert_eq!(account.role, Role::FlatOwner);
        assert_eq!(account.contact_number.as_str(), "9876543210");
        assert_eq!(account.created_at.timestamp_micros(), now.timestamp_micros());
        assert!(account.profile_image.is_none());
    }

    #[test]
    fn test_get_missing() {
        let conn = setup();
        assert!(get_account(&conn, 42).unwrap().is_none());
    }

    #[test]
    fn test_find_by_contact_newest_first() {
        let conn = setup();
        let base = Utc::now();
        let older = insert(&conn, "9876543210", "Older", base - Duration::days(3));
        let newer = insert(&conn, "9876543210", "Newer", base);
        insert(&conn, "9123456789", "Someone else", base + Duration::days(1));

        let found = find_by_contact(&conn, &ContactNumber::parse("9876543210").unwrap()).unwrap();
        let ids: Vec<i64> = found.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![newer, older]);
    }

    #[test]
    fn test_same_timestamp_prefers_later_insert() {
        let conn = setup();
        let at = Utc::now();
        insert(&conn, "9876543210", "First", at);
        let second = insert(&conn, "9876543210", "Second", at);

        let found = find_by_contact(&conn, &ContactNumber::parse("9876543210").unwrap()).unwrap();
        assert_eq!(found[0].id, second);
    }

    #[test]
    fn test_find_by_contact_none() {
        let conn = setup();
        let found = find_by_contact(&conn, &ContactNumber::parse("9000000000").unwrap()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_credential_stored_verbatim() {
        let conn = setup();
        let id = insert(&conn, "9876543210", "Anil", Utc::now());
        let first = get_account(&conn, id).unwrap().unwrap();

        // Saving a loaded credential again must not hash it a second time
        let sealed = first.aadhar.clone();
        let again = insert_account(
            &conn,
            &AccountRow {
                role: first.role,
                full_name: &first.full_name,
                contact_number: &first.contact_number,
                aadhar: &sealed,
                date_of_birth: first.date_of_birth,
                password_hash: &first.password_hash,
                created_at: Utc::now(),
            },
        )
        .unwrap();
        let second = get_account(&conn, again).unwrap().unwrap();
        assert_eq!(second.password_hash, first.password_hash);
    }

    #[test]
    fn test_plaintext_password_column_is_rejected_on_load() {
        let conn = setup();
        let id = insert(&conn, "9876543210", "Anil", Utc::now());
        conn.execute(
            "UPDATE accounts SET password_hash = 'secret1' WHERE id = ?1",
            params![id],
        )
        .unwrap();
        assert!(get_account(&conn, id).is_err());
    }

    #[test]
    fn test_profile_image_update() {
        let conn = setup();
        let id = insert(&conn, "9876543210", "Anil", Utc::now());
        assert!(set_profile_image(&conn, id, Some("profiles/abc.png")).unwrap());
        assert!(!set_profile_image(&conn, id + 100, Some("profiles/abc.png")).unwrap());

        let account = get_account(&conn, id).unwrap().unwrap();
        assert_eq!(account.profile_image.as_deref(), Some("profiles/abc.png"));
        assert_eq!(account.profile_image_url().as_deref(), Some("/media/profiles/abc.png"));

        assert!(set_profile_image(&conn, id, None).unwrap());
        let account = get_account(&conn, id).unwrap().unwrap();
        assert!(account.profile_image.is_none());
        assert!(account.profile_image_url().is_none());
    }

    #[test]
    fn test_contact_exists_and_count() {
        let conn = setup();
        assert_eq!(count_accounts(&conn).unwrap(), 0);
        insert(&conn, "9876543210", "Anil", Utc::now());
        assert!(contact_exists(&conn, &ContactNumber::parse("9876543210").unwrap()).unwrap());
        assert!(!contact_exists(&conn, &ContactNumber::parse("9876543211").unwrap()).unwrap());
        assert_eq!(count_accounts(&conn).unwrap(), 1);
    }
}

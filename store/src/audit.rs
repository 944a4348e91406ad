use anyhow::{Context, Result};
use fleet_types::{
    AuditAction, AuditId, AuditUser, LoginAuditEntry, OrgId, UserId, UserRole,
};
use rusqlite::{Row, params};

use crate::sqlite_util::{text_col, ts, ts_col, uuid_col};
use crate::{Store, now};

/// Column a login-audit page is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuditSort {
    #[default]
    CreatedAt,
    Action,
    Ip,
    UserAgent,
    /// Orders by the user's email.
    User,
}

impl AuditSort {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "createdAt" => Some(Self::CreatedAt),
            "action" => Some(Self::Action),
            "ip" => Some(Self::Ip),
            "userAgent" => Some(Self::UserAgent),
            "user" => Some(Self::User),
            _ => None,
        }
    }

    const fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "a.created_at",
            Self::Action => "a.action",
            Self::Ip => "a.ip",
            Self::UserAgent => "a.user_agent",
            Self::User => "u.email",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    const fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A resolved audit page request. Paging bounds are enforced by the caller.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    /// `None` lists entries of every organization.
    pub org_id: Option<OrgId>,
    /// Case-insensitive substring over user email, user name, action and ip.
    pub search: Option<String>,
    pub sort: AuditSort,
    pub order: SortOrder,
    pub offset: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditPage {
    pub entries: Vec<LoginAuditEntry>,
    pub total: i64,
}

fn audit_from_row(row: &Row<'_>) -> rusqlite::Result<LoginAuditEntry> {
    Ok(LoginAuditEntry {
        id: AuditId::from_uuid(uuid_col(row, 0)?),
        user_id: UserId::from_uuid(uuid_col(row, 1)?),
        action: text_col(row, 2, AuditAction::parse)?,
        ip: row.get(3)?,
        user_agent: row.get(4)?,
        created_at: ts_col(row, 5)?,
        user: AuditUser {
            id: UserId::from_uuid(uuid_col(row, 6)?),
            email: row.get(7)?,
            name: row.get(8)?,
            role: text_col(row, 9, UserRole::parse)?,
        },
    })
}

/// `LIKE` pattern matching `needle` literally anywhere in the value.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

const AUDIT_FILTER: &str = "FROM login_audits a
     JOIN users u ON u.id = a.user_id
     WHERE (?1 IS NULL OR u.org_id = ?1)
       AND (?2 IS NULL
            OR fold(u.email) LIKE ?2 ESCAPE '\\'
            OR fold(u.name) LIKE ?2 ESCAPE '\\'
            OR fold(a.action) LIKE ?2 ESCAPE '\\'
            OR fold(a.ip) LIKE ?2 ESCAPE '\\')";

impl Store {
    pub fn record_login(
        &self,
        user_id: UserId,
        action: AuditAction,
        ip: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<AuditId> {
        let id = AuditId::new_v4();
        self.conn()?
            .execute(
                "INSERT INTO login_audits (id, user_id, action, ip, user_agent, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.to_string(),
                    user_id.to_string(),
                    action.as_str(),
                    ip,
                    user_agent,
                    ts(now())
                ],
            )
            .context("Failed to insert login audit entry")?;
        Ok(id)
    }

    pub fn search_login_audit(&self, query: &AuditQuery) -> Result<AuditPage> {
        let org = query.org_id.map(|id| id.to_string());
        let pattern = query
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .map(|s| contains_pattern(&s));

        let db = self.conn()?;
        let total: i64 = db
            .query_row(
                &format!("SELECT COUNT(*) {AUDIT_FILTER}"),
                params![org, pattern],
                |row| row.get(0),
            )
            .context("Failed to count login audit entries")?;

        let sql = format!(
            "SELECT a.id, a.user_id, a.action, a.ip, a.user_agent, a.created_at,
                    u.id, u.email, u.name, u.role
             {AUDIT_FILTER}
             ORDER BY {column} {order}, a.created_at DESC, a.id ASC
             LIMIT ?3 OFFSET ?4",
            column = query.sort.column(),
            order = query.order.keyword(),
        );
        let mut stmt = db
            .prepare(&sql)
            .context("Failed to prepare login audit query")?;
        let entries = stmt
            .query_map(
                params![org, pattern, i64::from(query.limit), i64::from(query.offset)],
                audit_from_row,
            )
            .context("Failed to query login audit")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read login audit row")?;

        Ok(AuditPage { entries, total })
    }
}

//! The database security object.

use model::SecurityObject;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use transport::Request;

use crate::database::Database;
use crate::error::Result;
use crate::reply::Ack;

impl Database {
    /// Reads `/{db}/_security` into any compatible shape.
    pub async fn security<T: DeserializeOwned>(&self) -> Result<T> {
        self.send_json(Request::get(self.endpoint().segment("_security")))
            .await
    }

    /// Replaces `/{db}/_security`.
    pub async fn set_security<T: Serialize + ?Sized>(&self, security: &T) -> Result<()> {
        let request = Request::put(self.endpoint().segment("_security")).json(security)?;
        let ack: Ack = self.send_json(request).await?;
        ack.require("set_security")
    }

    /// Returns a helper that edits this database's admins and members.
    pub fn database_security(&self) -> DatabaseSecurity {
        DatabaseSecurity { db: self.clone() }
    }
}

/// Edits one database's security object entry by entry.
///
/// Each call reads the current object, applies one change and writes it
/// back. Adding an entry that is already present, or removing one that is
/// absent, changes nothing and writes nothing. The calls return whether the
/// object changed.
///
/// The read and the write are separate requests, so concurrent editors can
/// overwrite each other's changes.
#[derive(Debug, Clone)]
pub struct DatabaseSecurity {
    db: Database,
}

impl DatabaseSecurity {
    /// Reads the current security object.
    pub async fn get(&self) -> Result<SecurityObject> {
        self.db.security().await
    }

    /// Grants admin rights to user `name`.
    pub async fn add_admin(&self, name: &str) -> Result<bool> {
        self.edit(|s| s.admins.add_name(name)).await
    }

    /// Revokes admin rights from user `name`.
    pub async fn delete_admin(&self, name: &str) -> Result<bool> {
        self.edit(|s| s.admins.remove_name(name)).await
    }

    /// Grants admin rights to role `role`.
    pub async fn add_admin_role(&self, role: &str) -> Result<bool> {
        self.edit(|s| s.admins.add_role(role)).await
    }

    /// Revokes admin rights from role `role`.
    pub async fn delete_admin_role(&self, role: &str) -> Result<bool> {
        self.edit(|s| s.admins.remove_role(role)).await
    }

    /// Grants membership to user `name`.
    pub async fn add_member(&self, name: &str) -> Result<bool> {
        self.edit(|s| s.members.add_name(name)).await
    }

    /// Revokes membership from user `name`.
    pub async fn delete_member(&self, name: &str) -> Result<bool> {
        self.edit(|s| s.members.remove_name(name)).await
    }

    /// Grants membership to role `role`.
    pub async fn add_member_role(&self, role: &str) -> Result<bool> {
        self.edit(|s| s.members.add_role(role)).await
    }

    /// Revokes membership from role `role`.
    pub async fn delete_member_role(&self, role: &str) -> Result<bool> {
        self.edit(|s| s.members.remove_role(role)).await
    }

    async fn edit(&self, change: impl FnOnce(&mut SecurityObject) -> bool) -> Result<bool> {
        let mut security = self.get().await?;
        if !change(&mut security) {
            debug!(db = %self.db.name(), "security object already up to date");
            return Ok(false);
        }
        self.db.set_security(&security).await?;
        Ok(true)
    }
}

//! Server-scope operations.

use std::sync::Arc;
use std::time::Duration;

use feeds::{open_feed, Feed};
use model::feed::{continuous_query, one_shot_query};
use model::{
    ConfigurationError, DatabaseName, Options, ReplicationResult, Revision, ServerEvent,
    ServerInfo, UserRecord,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, instrument};
use transport::{
    read_json, Authenticator, BasicAuth, Connection, Deadline, Endpoint, Request, SessionCookie,
    StatusCode,
};

use crate::config::ClientConfig;
use crate::database::Database;
use crate::error::{Error, Result};
use crate::session::Session;

const USERS_DB: &str = "_users";

/// A handle to one CouchDB server.
///
/// Cloning is cheap; clones share the HTTP client and credentials. Every
/// method takes `&self` and the handle may be used from many tasks at once.
#[derive(Debug, Clone)]
pub struct Server {
    conn: Connection,
    auth: Option<Arc<dyn Authenticator>>,
}

impl Server {
    /// Connects using `config`.
    ///
    /// Basic credentials are attached when a user name is configured. No
    /// request is sent; call [`Server::info`] to check the server is up.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let auth = config.username.as_ref().map(|user| {
            let password = config.password.clone().unwrap_or_default();
            Arc::new(BasicAuth::new(user.clone(), password)) as Arc<dyn Authenticator>
        });
        Ok(Self::new(Connection::new(&config.url, config.timeout)?, auth))
    }

    /// Connects to `http://{host}:{port}`.
    ///
    /// A zero `timeout` means requests have no client-side deadline.
    pub fn connect_to(
        host: &str,
        port: u16,
        auth: Option<Arc<dyn Authenticator>>,
        timeout: Duration,
    ) -> Result<Self> {
        let timeout = (!timeout.is_zero()).then_some(timeout);
        let conn = Connection::new(&format!("http://{host}:{port}"), timeout)?;
        Ok(Self::new(conn, auth))
    }

    /// Wraps an existing connection.
    pub fn new(conn: Connection, auth: Option<Arc<dyn Authenticator>>) -> Self {
        Self { conn, auth }
    }

    /// Returns a copy with the same settings and credentials but its own
    /// HTTP client, so its requests never wait on this handle's pool.
    pub fn duplicate(&self) -> Result<Self> {
        Ok(Self::new(self.conn.duplicate()?, self.auth.clone()))
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn auth(&self) -> Option<&dyn Authenticator> {
        self.auth.as_deref()
    }

    fn get(&self, endpoint: Endpoint) -> Request<'_> {
        Request::get(endpoint).auth(self.auth())
    }

    // -----------------------------------------------------------------------
    // Server information
    // -----------------------------------------------------------------------

    /// Fetches the welcome document. Doubles as a liveness check.
    pub async fn info(&self) -> Result<ServerInfo> {
        Ok(self.conn.send_json(self.get(Endpoint::root())).await?)
    }

    /// Lists running tasks (compactions, replications, indexers).
    pub async fn active_tasks<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(self
            .conn
            .send_json(self.get(Endpoint::path("_active_tasks")))
            .await?)
    }

    /// Lists cluster and known nodes.
    ///
    /// Servers without clustering answer 400, reported as
    /// [`Error::NotSupported`].
    pub async fn membership<T: DeserializeOwned>(&self) -> Result<T> {
        match self
            .conn
            .send_json(self.get(Endpoint::path("_membership")))
            .await
        {
            Err(err) if err.status() == Some(StatusCode::BAD_REQUEST) => Err(Error::NotSupported {
                operation: "membership",
            }),
            other => Ok(other?),
        }
    }

    /// Reads server statistics below `path` (e.g. `["couchdb",
    /// "request_time"]`); an empty path returns all of them.
    pub async fn stats<T: DeserializeOwned>(&self, path: &[&str]) -> Result<T> {
        let endpoint = path
            .iter()
            .fold(Endpoint::path("_stats"), |endpoint, part| endpoint.segment(part));
        Ok(self.conn.send_json(self.get(endpoint)).await?)
    }

    /// Returns the tail of the server log. `bytes == 0` uses the server's
    /// default length.
    pub async fn log(&self, bytes: u64) -> Result<String> {
        let mut request = self.get(Endpoint::path("_log"));
        if bytes > 0 {
            request = request.param("bytes", bytes);
        }
        let response = self.conn.send(request).await?;
        Ok(response.text().await.map_err(transport::Error::from)?)
    }

    /// Lists every database on the server.
    pub async fn all_dbs(&self) -> Result<Vec<String>> {
        Ok(self.conn.send_json(self.get(Endpoint::path("_all_dbs"))).await?)
    }

    /// Asks the server for `count` fresh uuids.
    pub async fn uuids(&self, count: u32) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct Uuids {
            uuids: Vec<String>,
        }

        if count < 1 {
            return Err(ConfigurationError::InvalidCount { argument: "count" }.into());
        }
        let reply: Uuids = self
            .conn
            .send_json(self.get(Endpoint::path("_uuids")).param("count", count))
            .await?;
        Ok(reply.uuids)
    }

    /// Replicates `source` into `target`. `options` are merged into the
    /// request body (e.g. `create_target`, `continuous`, `doc_ids`).
    pub async fn replicate(
        &self,
        source: &str,
        target: &str,
        options: &Options,
    ) -> Result<ReplicationResult> {
        let mut body: Map<String, Value> = options
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        body.insert("source".into(), source.into());
        body.insert("target".into(), target.into());

        let request = Request::post(Endpoint::path("_replicate"))
            .json(&body)?
            .auth(self.auth());
        Ok(self.conn.send_json(request).await?)
    }

    // -----------------------------------------------------------------------
    // Databases
    // -----------------------------------------------------------------------

    /// Returns a handle to an existing database.
    ///
    /// `auth` overrides the server's credentials for that handle. A missing
    /// database is reported as [`Error::NotFound`].
    pub async fn database(
        &self,
        name: &str,
        auth: Option<Arc<dyn Authenticator>>,
    ) -> Result<Database> {
        let name = DatabaseName::parse(name)?;
        let auth = auth.or_else(|| self.auth.clone());

        let request = Request::head(Endpoint::path(&name)).auth(auth.as_deref());
        match self.conn.send(request).await {
            Ok(_) => Ok(Database::new(self.conn.clone(), auth, name)),
            Err(err) if err.is_not_found() => Err(Error::NotFound {
                what: format!("database '{name}'"),
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Returns a handle to `name`, creating the database if it is missing.
    pub async fn must_get_database(
        &self,
        name: &str,
        auth: Option<Arc<dyn Authenticator>>,
    ) -> Result<Database> {
        match self.database(name, auth.clone()).await {
            Err(err) if err.is_not_found() => {
                debug!(db = name, "creating missing database");
                let db = self.create_database(name).await?;
                Ok(match auth {
                    Some(auth) => db.with_auth(auth),
                    None => db,
                })
            }
            other => other,
        }
    }

    /// Creates a database and returns a handle to it.
    pub async fn create_database(&self, name: &str) -> Result<Database> {
        let name = DatabaseName::parse(name)?;
        let request = Request::put(Endpoint::path(&name)).auth(self.auth());
        self.conn.send(request).await?;
        Ok(Database::new(self.conn.clone(), self.auth.clone(), name))
    }

    // -----------------------------------------------------------------------
    // Database updates
    // -----------------------------------------------------------------------

    /// Waits for a single database event and decodes it as `T`.
    ///
    /// `feed=continuous` is rejected; use [`Server::db_updates_feed`]. A
    /// `timeout` option (milliseconds) is forwarded to the server and the
    /// request's deadline is extended by the same amount. `None` means the
    /// server's wait elapsed without an event.
    ///
    /// 1.x servers answer with a single [`ServerEvent`]; 2.x+ servers answer
    /// with a `{"results": [...], "last_seq": ...}` page.
    pub async fn db_update<T: DeserializeOwned>(&self, options: &Options) -> Result<Option<T>> {
        let query = one_shot_query("db_update", options)?;
        let mut request = self.get(Endpoint::path("_db_updates")).query(query);
        if let (Some(base), Some(wait)) = (self.conn.timeout(), server_wait(options)) {
            request = request.deadline(Deadline::Custom(base + wait));
        }

        let response = self.conn.send(request).await?;
        let body: Option<Value> = read_json(response).await.or_else(|err| match err {
            transport::Error::Decode(e) if e.is_eof() => Ok(None),
            other => Err(other),
        })?;
        match body {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(
                serde_json::from_value(value).map_err(transport::Error::from)?,
            )),
        }
    }

    /// Opens a continuous feed of database lifecycle events.
    ///
    /// Every option except `feed` is forwarded (e.g. `heartbeat`, `since`).
    /// A `feed` option other than `continuous` is rejected before any request.
    #[instrument(skip_all)]
    pub async fn db_updates_feed(&self, options: &Options) -> Result<Feed<ServerEvent>> {
        let query = continuous_query("db_updates_feed", options)?;
        let request = self.get(Endpoint::path("_db_updates")).query(query);
        Ok(open_feed(&self.conn, request).await?)
    }

    // -----------------------------------------------------------------------
    // Users and sessions
    // -----------------------------------------------------------------------

    /// Logs in with cookie authentication.
    #[instrument(skip(self, password))]
    pub async fn new_session(&self, user: &str, password: &str) -> Result<Session> {
        let request = Request::post(Endpoint::path("_session"))
            .json(&json!({ "name": user, "password": password }))?
            .auth(self.auth());
        let response = self.conn.send(request).await?;
        let cookie = SessionCookie::from_headers(response.headers())
            .ok_or(transport::Error::MissingHeader { name: "Set-Cookie" })?;
        Ok(Session::new(self.clone(), cookie))
    }

    /// Writes `user` to the `_users` database, creating it if missing.
    pub async fn create_user(&self, user: &UserRecord) -> Result<Revision> {
        let users = self.must_get_database(USERS_DB, None).await?;
        users.put(&user.document_id(), user).await
    }
}

/// The server-side wait requested through a `timeout` option.
fn server_wait(options: &Options) -> Option<Duration> {
    let value = options.get("timeout")?;
    let millis = value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))?;
    Some(Duration::from_millis(millis))
}

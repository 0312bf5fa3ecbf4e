use std::sync::Arc;

use tracing::{debug, info};
use wpzip_core::{DatabaseCredentials, RemoteCommandRunner};

use super::{DatabaseDump, DatabaseExporter, ExportStrategy, MYSQLDUMP_PROBE, mysql_credentials, redact};
use crate::error::{PackagerError, PackagerResult};

/// Streams `mysqldump` output straight from a remote command channel.
pub struct MysqldumpExporter {
    runner: Arc<dyn RemoteCommandRunner>,
    credentials: DatabaseCredentials,
}

impl MysqldumpExporter {
    /// Exporter running commands through `runner`.
    #[must_use]
    pub fn new(runner: Arc<dyn RemoteCommandRunner>, credentials: DatabaseCredentials) -> Self {
        Self {
            runner,
            credentials,
        }
    }
}

impl DatabaseExporter for MysqldumpExporter {
    fn strategy(&self) -> ExportStrategy {
        ExportStrategy::Mysqldump
    }

    fn export(&self) -> PackagerResult<DatabaseDump> {
        if !self.runner.can_run(MYSQLDUMP_PROBE) {
            return Err(PackagerError::UtilityNotFound {
                utility: "mysqldump",
            });
        }

        let credentials = mysql_credentials(&self.credentials);
        let check = format!("mysql {credentials} -e\"quit\"");
        debug!(command = %redact(&check, &self.credentials), "checking database credentials");
        if !self.runner.can_run(&check) {
            return Err(PackagerError::CredentialsRejected {
                user: self.credentials.user.clone(),
            });
        }

        let dump = format!("mysqldump --no-tablespaces {credentials}");
        info!(database = %self.credentials.name, "starting mysqldump");
        let body = self
            .runner
            .run(&dump)
            .map_err(|source| {
                PackagerError::remote("export.mysqldump", redact(&dump, &self.credentials), source)
            })?;
        Ok(DatabaseDump::new(body))
    }
}

use crate::{Result, TestInfraError};
use std::time::Duration;
use testcontainers::core::{CmdWaitFor, ExecCommand, IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::ImageExt;
use testcontainers::{ContainerAsync, GenericImage};
use typed_builder::TypedBuilder;

const POSTGRES_PORT: u16 = 5432;
const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, TypedBuilder)]
pub struct PostgresConfig {
    #[builder(default = "16-alpine".to_string())]
    tag: String,
    #[builder(default = "snip".to_string())]
    database: String,
    #[builder(default = "snip".to_string())]
    username: String,
    #[builder(default = "snip".to_string())]
    password: String,
    /// How long to wait for the server to accept TCP connections.
    #[builder(default = Duration::from_secs(30))]
    ready_timeout: Duration,
}

/// A disposable Postgres server, removed when dropped.
pub struct PostgresServer {
    container: ContainerAsync<GenericImage>,
    config: PostgresConfig,
}

impl PostgresServer {
    /// Starts the container and returns once the final server accepts
    /// TCP connections.
    pub async fn new(config: PostgresConfig) -> Result<Self> {
        let container = GenericImage::new("postgres", config.tag.as_str())
            .with_exposed_port(POSTGRES_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stderr(
                "database system is ready to accept connections",
            ))
            .with_env_var("POSTGRES_DB", config.database.as_str())
            .with_env_var("POSTGRES_USER", config.username.as_str())
            .with_env_var("POSTGRES_PASSWORD", config.password.as_str())
            .start()
            .await?;

        let server = Self { container, config };
        server.wait_until_ready().await?;
        Ok(server)
    }

    /// The entrypoint runs init scripts against a temporary server that
    /// only listens on a unix socket, so a successful `pg_isready` over
    /// TCP inside the container means the final server is up.
    async fn wait_until_ready(&self) -> Result<()> {
        let deadline = tokio::time::Instant::now() + self.config.ready_timeout;

        loop {
            let check = ExecCommand::new([
                "pg_isready",
                "-h",
                "127.0.0.1",
                "-p",
                "5432",
                "-U",
                self.config.username.as_str(),
                "-d",
                self.config.database.as_str(),
            ])
            .with_cmd_ready_condition(CmdWaitFor::exit());

            let mut result = self.container.exec(check).await?;
            if result.exit_code().await? == Some(0) {
                return Ok(());
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(TestInfraError::NotReady(format!(
                    "postgres did not accept tcp connections within {:?}",
                    self.config.ready_timeout
                )));
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    pub async fn host(&self) -> Result<String> {
        Ok(self.container.get_host().await?.to_string())
    }

    pub async fn port(&self) -> Result<u16> {
        Ok(self.container.get_host_port_ipv4(POSTGRES_PORT).await?)
    }

    /// Connection string for the mapped host port.
    pub async fn database_url(&self) -> Result<String> {
        let host = self.host().await?;
        let port = self.port().await?;
        Ok(format!(
            "postgres://{}:{}@{}:{}/{}",
            self.config.username, self.config.password, host, port, self.config.database
        ))
    }

    pub fn container(&self) -> &ContainerAsync<GenericImage> {
        &self.container
    }
}

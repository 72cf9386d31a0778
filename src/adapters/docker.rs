use crate::domain::model::{BindConfig, Binding, ContainerConfig, ContainerInfo, PortSpec};
use crate::domain::ports::ContainerManager;
use crate::utils::error::Result;
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::image::CreateImageOptions;
use bollard::models::{ContainerCreateResponse, ContainerInspectResponse, CreateImageInfo, HostConfig};
use bollard::Docker;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::{BTreeMap, HashMap};

/// The slice of the Docker API the manager needs.
#[async_trait]
pub trait DockerClient: Send + Sync {
    /// Pull progress stream; the pull is complete once the stream ends.
    fn pull_image(&self, image: &str) -> BoxStream<'_, std::result::Result<CreateImageInfo, DockerError>>;

    async fn create_container(
        &self,
        name: &str,
        config: Config<String>,
    ) -> std::result::Result<ContainerCreateResponse, DockerError>;

    async fn start_container(&self, name: &str) -> std::result::Result<(), DockerError>;

    async fn stop_container(&self, name: &str) -> std::result::Result<(), DockerError>;

    async fn remove_container(&self, name: &str) -> std::result::Result<(), DockerError>;

    async fn inspect_container(
        &self,
        name: &str,
    ) -> std::result::Result<ContainerInspectResponse, DockerError>;
}

#[async_trait]
impl DockerClient for Docker {
    fn pull_image(&self, image: &str) -> BoxStream<'_, std::result::Result<CreateImageInfo, DockerError>> {
        self.create_image(Some(pull_options(image)), None, None).boxed()
    }

    async fn create_container(
        &self,
        name: &str,
        config: Config<String>,
    ) -> std::result::Result<ContainerCreateResponse, DockerError> {
        let options = CreateContainerOptions {
            name: name.to_string(),
            platform: None,
        };
        Docker::create_container(self, Some(options), config).await
    }

    async fn start_container(&self, name: &str) -> std::result::Result<(), DockerError> {
        Docker::start_container(self, name, None::<StartContainerOptions<String>>).await
    }

    async fn stop_container(&self, name: &str) -> std::result::Result<(), DockerError> {
        Docker::stop_container(self, name, None::<StopContainerOptions>).await
    }

    async fn remove_container(&self, name: &str) -> std::result::Result<(), DockerError> {
        Docker::remove_container(self, name, None::<RemoveContainerOptions>).await
    }

    async fn inspect_container(
        &self,
        name: &str,
    ) -> std::result::Result<ContainerInspectResponse, DockerError> {
        Docker::inspect_container(self, name, None::<InspectContainerOptions>).await
    }
}

/// 空的 tag 會讓 Docker 拉下所有 tag，未指定時固定用 `latest`
///
/// The tag is whatever follows the last `:` after the last `/`, so a registry
/// port such as `localhost:5000/geth` is not mistaken for a tag. Digest
/// references are passed through untouched.
pub fn pull_options(image: &str) -> CreateImageOptions<String> {
    if image.contains('@') {
        return CreateImageOptions {
            from_image: image.to_string(),
            ..Default::default()
        };
    }

    let name_start = image.rfind('/').map_or(0, |slash| slash + 1);
    let (from_image, tag) = match image[name_start..].rfind(':') {
        Some(colon) => {
            let split = name_start + colon;
            (&image[..split], &image[split + 1..])
        }
        None => (image, ""),
    };
    let tag = if tag.is_empty() { "latest" } else { tag };

    CreateImageOptions {
        from_image: from_image.to_string(),
        tag: tag.to_string(),
        ..Default::default()
    }
}

/// Runs each instance as one container named after the instance id, with every
/// plan port published to an ephemeral host port.
pub struct DockerContainerManager<C: DockerClient = Docker> {
    client: C,
    /// Address the broker uses to reach published ports.
    internal_address: String,
    external_address: String,
}

impl<C: DockerClient> DockerContainerManager<C> {
    pub fn new(client: C, internal_address: String, external_address: String) -> Self {
        Self {
            client,
            internal_address,
            external_address,
        }
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        tracing::info!(image, "Pulling image");

        let mut stream = self.client.pull_image(image);
        while let Some(progress) = stream.next().await {
            let info = progress.map_err(|e| {
                tracing::error!(image, error = %e, "image-pull-failed");
                e
            })?;
            if let Some(status) = info.status {
                tracing::debug!(image, status = %status, "Pull progress");
            }
        }

        Ok(())
    }
}

fn container_config(config: &ContainerConfig) -> Result<Config<String>> {
    let exposed_ports: HashMap<String, HashMap<(), ()>> = PortSpec::parse_all(&config.exposed_ports)?
        .iter()
        .map(|spec| (spec.docker_key(), HashMap::new()))
        .collect();

    let host_config = HostConfig {
        publish_all_ports: Some(true),
        privileged: Some(false),
        ..Default::default()
    };

    Ok(Config {
        image: Some(config.image.clone()),
        exposed_ports: Some(exposed_ports),
        attach_stdin: Some(false),
        attach_stdout: Some(true),
        attach_stderr: Some(true),
        tty: Some(false),
        open_stdin: Some(false),
        network_disabled: Some(false),
        host_config: Some(host_config),
        ..Default::default()
    })
}

#[async_trait]
impl<C: DockerClient> ContainerManager for DockerContainerManager<C> {
    async fn provision(&self, config: &ContainerConfig) -> Result<()> {
        // 先拉取映像檔，背景更新過的版本不需重啟 broker 也能生效
        self.pull_image(&config.image).await?;

        let docker_config = container_config(config)?;
        let name = config.name.as_str();

        let created = self
            .client
            .create_container(name, docker_config)
            .await
            .map_err(|e| {
                tracing::error!(name, error = %e, "container-creation-failed");
                e
            })?;
        tracing::info!(id = %created.id, name, "container-created");

        self.client.start_container(name).await.map_err(|e| {
            tracing::error!(name, error = %e, "container-start-failed");
            e
        })?;
        tracing::info!(name, "container-started");

        Ok(())
    }

    async fn deprovision(&self, instance_id: &str) -> Result<()> {
        self.client.stop_container(instance_id).await.map_err(|e| {
            tracing::error!(name = instance_id, error = %e, "container-stopping-failed");
            e
        })?;

        self.client.remove_container(instance_id).await.map_err(|e| {
            tracing::error!(name = instance_id, error = %e, "container-removal-failed");
            e
        })?;

        tracing::info!(name = instance_id, "container-removed");
        Ok(())
    }

    async fn bind(&self, config: &BindConfig) -> Result<ContainerInfo> {
        let inspected = self.client.inspect_container(&config.instance_id).await?;

        let port_map = inspected
            .network_settings
            .and_then(|settings| settings.ports)
            .unwrap_or_default();

        let mut bindings = BTreeMap::new();
        for (key, docker_bindings) in port_map {
            // "8545/tcp" -> "8545"
            let internal_port = key.split('/').next().unwrap_or(&key).to_string();
            let container_bindings: Vec<Binding> = docker_bindings
                .unwrap_or_default()
                .into_iter()
                .map(|binding| Binding {
                    port: binding.host_port.unwrap_or_default(),
                    host_ip: binding.host_ip.unwrap_or_default(),
                })
                .collect();
            bindings.insert(internal_port, container_bindings);
        }

        Ok(ContainerInfo {
            internal_address: self.internal_address.clone(),
            external_address: self.external_address.clone(),
            bindings,
        })
    }
}

//! Vehicle app composition root
//!
//! Wires the middleware, the broker clients and the door client together
//! and drives their lifecycle through a [`ConnectionSupervisor`].

use std::sync::Arc;

use sdv_broker::{
    BrokerProtocol, DataBrokerModelClient, DataBrokerV1Client, DataBrokerV2Client,
    SignalBrokerClient, VehicleServiceClient,
};
use sdv_core::{ChannelFactory, Middleware};
use tracing::info;

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::supervisor::{ConnectReport, ConnectionSupervisor};

pub struct VehicleApp {
    middleware: Box<dyn Middleware>,
    databroker_v1: Arc<DataBrokerV1Client>,
    databroker_v2: Arc<DataBrokerV2Client>,
    databroker_model: Arc<DataBrokerModelClient>,
    vehicle_service: Arc<VehicleServiceClient>,
    supervisor: ConnectionSupervisor,
}

impl VehicleApp {
    /// Build the app. Service locations are resolved here, so an
    /// unconfigured service fails construction.
    pub fn new(
        config: &AppConfig,
        middleware: Box<dyn Middleware>,
        factory: Arc<dyn ChannelFactory>,
    ) -> AppResult<Self> {
        let broker_endpoint = config.databroker.resolve(middleware.as_ref())?;
        let door_endpoint = config.vehicle_service.resolve(middleware.as_ref())?;

        let databroker_v1 = Arc::new(DataBrokerV1Client::new(broker_endpoint.clone(), factory.clone()));
        let databroker_v2 = Arc::new(DataBrokerV2Client::new(broker_endpoint.clone(), factory.clone()));
        let databroker_model = Arc::new(DataBrokerModelClient::new(broker_endpoint, factory.clone()));
        let vehicle_service = Arc::new(VehicleServiceClient::new(door_endpoint, factory));

        let mut supervisor = ConnectionSupervisor::new(config.supervisor.connect_timeout());
        supervisor.register(databroker_v1.clone());
        supervisor.register(databroker_v2.clone());
        supervisor.register(databroker_model.clone());
        supervisor.register(vehicle_service.clone());

        Ok(Self {
            middleware,
            databroker_v1,
            databroker_v2,
            databroker_model,
            vehicle_service,
            supervisor,
        })
    }

    /// Start the middleware and launch all connections without waiting
    pub fn start(&self) {
        info!(middleware = self.middleware.type_id(), "Running App");
        self.middleware.start();
        self.middleware.wait_until_ready();
        self.on_start();
    }

    /// Stop the middleware and release all connections
    pub async fn stop(&self) {
        info!("Stopping App");
        self.middleware.stop();
        self.on_stop().await;
    }

    fn on_start(&self) {
        self.supervisor.start();
    }

    async fn on_stop(&self) {
        self.supervisor.stop().await;
    }

    /// Wait until every connect launched by `start()` has finished
    pub async fn join(&self) -> Vec<ConnectReport> {
        self.supervisor.join().await
    }

    pub fn databroker_v1(&self) -> &Arc<DataBrokerV1Client> {
        &self.databroker_v1
    }

    pub fn databroker_v2(&self) -> &Arc<DataBrokerV2Client> {
        &self.databroker_v2
    }

    pub fn databroker_model(&self) -> &Arc<DataBrokerModelClient> {
        &self.databroker_model
    }

    pub fn vehicle_service(&self) -> &Arc<VehicleServiceClient> {
        &self.vehicle_service
    }

    /// The broker client speaking `protocol`
    pub fn broker(&self, protocol: BrokerProtocol) -> Arc<dyn SignalBrokerClient> {
        match protocol {
            BrokerProtocol::V1 => self.databroker_v1.clone(),
            BrokerProtocol::V2 => self.databroker_v2.clone(),
            BrokerProtocol::Model => self.databroker_model.clone(),
        }
    }
}

//! Exposure probing pipeline - fixed, sequential probe order against one target

use super::{ScanStep, ScanTarget};
use crate::findings::classify;
use crate::probes::{default_backdoor_paths, default_credentials, AuthTransport, Credential, ExposureProbes, ProbeResult};
use futures::stream::{self, Stream};
use std::sync::Arc;

/// One step of the fixed scan plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedProbe {
    HttpAccess,
    BasicAuth(AuthTransport, Credential),
    BackdoorFile(String),
    Ssh(Credential),
    Ftp(Credential),
}

impl PlannedProbe {
    pub fn description(&self) -> String {
        match self {
            PlannedProbe::HttpAccess => "Testing HTTP access".to_string(),
            PlannedProbe::BasicAuth(AuthTransport::Native, cred) => format!("Testing HTTP Basic Auth (native): {}", cred),
            PlannedProbe::BasicAuth(_, cred) => format!("Testing HTTP Basic Auth (curl): {}", cred),
            PlannedProbe::BackdoorFile(path) => format!("Checking file: {}", path),
            PlannedProbe::Ssh(cred) => format!("Testing SSH: {}", cred),
            PlannedProbe::Ftp(cred) => format!("Testing FTP: {}", cred),
        }
    }

    async fn execute<P: ExposureProbes + ?Sized>(&self, probes: &P, target: &ScanTarget) -> ProbeResult {
        match self {
            PlannedProbe::HttpAccess => probes.http_access(target.base_url()).await,
            PlannedProbe::BasicAuth(transport, cred) => probes.basic_auth(*transport, target.base_url(), cred).await,
            PlannedProbe::BackdoorFile(path) => probes.backdoor_file(target.base_url(), path).await,
            PlannedProbe::Ssh(cred) => probes.ssh_access(target.host(), cred).await,
            PlannedProbe::Ftp(cred) => probes.ftp_access(target.host(), cred).await,
        }
    }
}

/// Runs every probe against one target, one network operation at a time
pub struct ExposurePipeline<P> {
    probes: Arc<P>,
    credentials: Vec<Credential>,
    backdoor_paths: Vec<String>,
}

impl<P> Clone for ExposurePipeline<P> {
    fn clone(&self) -> Self {
        Self {
            probes: Arc::clone(&self.probes),
            credentials: self.credentials.clone(),
            backdoor_paths: self.backdoor_paths.clone(),
        }
    }
}

impl<P: ExposureProbes + 'static> ExposurePipeline<P> {
    pub fn new(probes: P) -> Self {
        Self::from_shared(Arc::new(probes))
    }

    pub fn from_shared(probes: Arc<P>) -> Self {
        Self {
            probes,
            credentials: default_credentials(),
            backdoor_paths: default_backdoor_paths(),
        }
    }

    pub fn with_credentials(mut self, credentials: Vec<Credential>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_backdoor_paths(mut self, paths: Vec<String>) -> Self {
        self.backdoor_paths = paths;
        self
    }

    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }

    /// Ordered plan: HTTP check, native+curl Basic-Auth per credential,
    /// one check per sensitive path, then SSH and FTP per credential.
    ///
    /// There is no early exit on success; every credential is tried on every transport.
    pub fn plan(&self) -> Vec<PlannedProbe> {
        let mut plan = Vec::with_capacity(self.step_count());
        plan.push(PlannedProbe::HttpAccess);

        for cred in &self.credentials {
            plan.push(PlannedProbe::BasicAuth(AuthTransport::Native, cred.clone()));
            plan.push(PlannedProbe::BasicAuth(AuthTransport::External, cred.clone()));
        }

        plan.extend(self.backdoor_paths.iter().cloned().map(PlannedProbe::BackdoorFile));
        plan.extend(self.credentials.iter().cloned().map(PlannedProbe::Ssh));
        plan.extend(self.credentials.iter().cloned().map(PlannedProbe::Ftp));
        plan
    }

    /// 1 + 2*|credentials| + |paths| + |credentials| + |credentials|
    pub fn step_count(&self) -> usize {
        1 + 4 * self.credentials.len() + self.backdoor_paths.len()
    }

    /// Lazily run the plan. Each poll performs exactly one probe; dropping the
    /// stream abandons the remaining steps. Calling `run` again starts over.
    pub fn run(&self, target: &ScanTarget) -> impl Stream<Item = ScanStep> + Send + 'static {
        let plan = self.plan();
        log::info!("Starting exposure scan of {} ({} steps)", target.base_url(), plan.len());

        let state = (plan.into_iter().enumerate(), Arc::clone(&self.probes), target.clone());

        stream::unfold(state, |(mut steps, probes, target)| async move {
            let (index, planned) = match steps.next() {
                Some(next) => next,
                None => {
                    log::info!("Exposure scan of {} finished", target.base_url());
                    return None;
                }
            };

            let description = planned.description();
            let result = planned.execute(probes.as_ref(), &target).await;
            let finding = classify(&result, &description);
            log::debug!("step {} [{}] {}: {}", index + 1, finding.severity, description, finding.summary);

            let step = ScanStep {
                step: index + 1,
                description,
                finding,
            };
            Some((step, (steps, probes, target)))
        })
    }
}

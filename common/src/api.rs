use crate::job::JobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Every HTTP call the dashboard makes against the scheduler gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Stats,
    Jobs { limit: u64, offset: u64 },
    DeadJobs { limit: u64, offset: u64 },
    Job(JobId),
    CreateJob,
    ResubmitJob(JobId),
}

impl Endpoint {
    pub fn method(&self) -> Method {
        match self {
            Endpoint::CreateJob | Endpoint::ResubmitJob(_) => Method::Post,
            _ => Method::Get,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Endpoint::Stats => "/stats".to_string(),
            Endpoint::Jobs { .. } | Endpoint::CreateJob => "/jobs".to_string(),
            Endpoint::DeadJobs { .. } => "/jobs/dead".to_string(),
            Endpoint::Job(id) => format!("/jobs/{}", id),
            Endpoint::ResubmitJob(id) => format!("/jobs/{}/resubmit", id),
        }
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Endpoint::Jobs { limit, offset } | Endpoint::DeadJobs { limit, offset } => {
                vec![("limit", limit.to_string()), ("offset", offset.to_string())]
            }
            _ => Vec::new(),
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let method = match self.method() {
            Method::Get => "GET",
            Method::Post => "POST",
        };
        write!(f, "{} {}", method, self.path())?;
        let query = self.query();
        if !query.is_empty() {
            let pairs: Vec<String> = query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            write!(f, "?{}", pairs.join("&"))?;
        }
        Ok(())
    }
}

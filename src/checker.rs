use crate::config::Technique;
use crate::payload::{self, PayloadArtifact, PayloadOptions, FINGERPRINT, REDIRECT_TEMPLATE};
use crate::transport::HttpReply;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // `/login?a=11111` not followed by another digit, so 111112 does not count.
    static ref FINGERPRINT_REDIRECT: Regex = Regex::new(&format!(
        r"{}{}(?:[^0-9]|$)",
        regex::escape(REDIRECT_TEMPLATE),
        FINGERPRINT
    ))
    .expect("fingerprint pattern is valid");
}

/// Error row the flight decoder emits when property resolution throws.
pub const DIGEST_SIGNATURE: &str = r#"E{"digest""#;

/// Header the framework uses to report a redirect thrown inside an action.
const ACTION_REDIRECT_HEADER: &str = "x-action-redirect";

/// Payload builder and response checker for one technique.
#[derive(Clone, Copy)]
pub struct Probe {
    pub technique: Technique,
    build: fn(&PayloadOptions) -> PayloadArtifact,
    check: fn(&HttpReply) -> bool,
}

impl Probe {
    pub fn build(&self, options: &PayloadOptions) -> PayloadArtifact {
        (self.build)(options)
    }

    pub fn is_vulnerable(&self, reply: &HttpReply) -> bool {
        (self.check)(reply)
    }
}

impl std::fmt::Debug for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Probe").field("technique", &self.technique).finish()
    }
}

impl Technique {
    /// The payload and its matching checker always come from here together.
    pub fn probe(self) -> Probe {
        let (build, check): (fn(&PayloadOptions) -> PayloadArtifact, fn(&HttpReply) -> bool) = match self {
            Technique::Safe => (payload::build_safe, is_vulnerable_safe),
            Technique::Rce => (payload::build_rce, is_vulnerable_rce),
            Technique::VercelWafBypass => (payload::build_vercel_waf_bypass, is_vulnerable_vercel),
        };

        Probe { technique: self, build, check }
    }
}

/// The command ran: the thrown redirect carries `/login?a=11111`.
///
/// Accepts the fingerprint in `Location` on a 3xx response, or in the
/// `X-Action-Redirect` header Next.js uses for server-action redirects
/// (whatever the status).
pub fn is_vulnerable_rce(reply: &HttpReply) -> bool {
    let location_hit = reply.is_redirect()
        && reply
            .header("location")
            .map_or(false, |location| FINGERPRINT_REDIRECT.is_match(location));

    location_hit
        || reply
            .header(ACTION_REDIRECT_HEADER)
            .map_or(false, |target| FINGERPRINT_REDIRECT.is_match(target))
}

/// Same primitive as the RCE check, only the request encoding differs.
pub fn is_vulnerable_vercel(reply: &HttpReply) -> bool {
    is_vulnerable_rce(reply)
}

/// Unpatched decoders answer the bogus `$1:aa:aa` reference with a 500 whose
/// body holds a digest error row. Platform mitigation layers produce a
/// look-alike, so those are discarded.
pub fn is_vulnerable_safe(reply: &HttpReply) -> bool {
    if reply.status != 500 || !reply.body.contains(DIGEST_SIGNATURE) {
        return false;
    }

    let server = reply.header("server").unwrap_or_default().trim().to_ascii_lowercase();
    let mitigated = reply.header("netlify-vary").is_some() || server == "netlify" || server == "vercel";

    !mitigated
}

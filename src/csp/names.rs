//! Directive names and source keywords, in wire form.

// Fetch directives
pub const DEFAULT_SRC: &str = "default-src";
pub const CHILD_SRC: &str = "child-src";
pub const CONNECT_SRC: &str = "connect-src";
pub const FONT_SRC: &str = "font-src";
pub const FRAME_SRC: &str = "frame-src";
pub const IMG_SRC: &str = "img-src";
pub const MANIFEST_SRC: &str = "manifest-src";
pub const MEDIA_SRC: &str = "media-src";
pub const OBJECT_SRC: &str = "object-src";
pub const PREFETCH_SRC: &str = "prefetch-src";
pub const SCRIPT_SRC: &str = "script-src";
pub const SCRIPT_SRC_ELEM: &str = "script-src-elem";
pub const SCRIPT_SRC_ATTR: &str = "script-src-attr";
pub const STYLE_SRC: &str = "style-src";
pub const STYLE_SRC_ELEM: &str = "style-src-elem";
pub const STYLE_SRC_ATTR: &str = "style-src-attr";
pub const WORKER_SRC: &str = "worker-src";
pub const FENCED_FRAME_SRC: &str = "fenced-frame-src";

// Document directives
pub const BASE_URI: &str = "base-uri";
pub const SANDBOX: &str = "sandbox";

// Navigation directives
pub const FORM_ACTION: &str = "form-action";
pub const FRAME_ANCESTORS: &str = "frame-ancestors";

// Reporting directives
pub const REPORT_TO: &str = "report-to";
pub const REPORT_URI: &str = "report-uri";

// Other directives
pub const REQUIRE_TRUSTED_TYPES_FOR: &str = "require-trusted-types-for";
pub const TRUSTED_TYPES: &str = "trusted-types";
pub const UPGRADE_INSECURE_REQUESTS: &str = "upgrade-insecure-requests";

// Deprecated
pub const BLOCK_ALL_MIXED_CONTENT: &str = "block-all-mixed-content";

pub const KNOWN_DIRECTIVES: &[&str] = &[
    DEFAULT_SRC,
    CHILD_SRC,
    CONNECT_SRC,
    FONT_SRC,
    FRAME_SRC,
    IMG_SRC,
    MANIFEST_SRC,
    MEDIA_SRC,
    OBJECT_SRC,
    PREFETCH_SRC,
    SCRIPT_SRC,
    SCRIPT_SRC_ELEM,
    SCRIPT_SRC_ATTR,
    STYLE_SRC,
    STYLE_SRC_ELEM,
    STYLE_SRC_ATTR,
    WORKER_SRC,
    FENCED_FRAME_SRC,
    BASE_URI,
    SANDBOX,
    FORM_ACTION,
    FRAME_ANCESTORS,
    REPORT_TO,
    REPORT_URI,
    REQUIRE_TRUSTED_TYPES_FOR,
    TRUSTED_TYPES,
    UPGRADE_INSECURE_REQUESTS,
    BLOCK_ALL_MIXED_CONTENT,
];

// Source keywords
pub const SELF: &str = "'self'";
pub const NONE: &str = "'none'";
pub const UNSAFE_INLINE: &str = "'unsafe-inline'";
pub const UNSAFE_EVAL: &str = "'unsafe-eval'";
pub const UNSAFE_HASHES: &str = "'unsafe-hashes'";
pub const STRICT_DYNAMIC: &str = "'strict-dynamic'";

/// Whether `wire_name` is a directive browsers know about.
pub fn is_known(wire_name: &str) -> bool {
    KNOWN_DIRECTIVES.contains(&wire_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csp::wire_name;

    #[test]
    fn camel_case_names_map_onto_known_directives() {
        for camel in ["scriptSrcElem", "requireTrustedTypesFor", "fencedFrameSrc", "baseUri"] {
            assert!(is_known(&wire_name(camel)), "{camel}");
        }
        assert!(!is_known("script-source"));
    }
}

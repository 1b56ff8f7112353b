//! Detector configuration data
//!
//! Keyword families, parameter-name patterns and severity assignments are
//! data, not control flow: the evaluation engine iterates whatever tables
//! the `DetectorConfig` carries, so families can be extended or re-weighted
//! without touching any check. The config is built once per scan and shared
//! read-only; nothing here is mutated at runtime.

use serde::{Deserialize, Serialize};

use super::finding::Severity;

/// A curated family of dangerous-capability keywords with a fixed severity
#[derive(Debug, Clone)]
pub struct KeywordFamily {
    /// Stable family key, e.g. "execution"
    pub key: &'static str,
    /// Human label used in finding titles
    pub label: &'static str,
    pub severity: Severity,
    /// Substring-matched against lower-cased tool name + description
    pub keywords: &'static [&'static str],
    pub cwe: Option<&'static str>,
}

/// Default dangerous-capability families.
///
/// Severity assignment: execution is CRITICAL; write-capable filesystem,
/// outbound network, database and privilege/auth control are HIGH;
/// filesystem read and environment/secret access are MEDIUM.
pub const DANGEROUS_FAMILIES: &[KeywordFamily] = &[
    KeywordFamily {
        key: "execution",
        label: "command or code execution",
        severity: Severity::Critical,
        keywords: &[
            "exec", "shell", "command", "spawn", "popen", "eval", "subprocess", "system(",
            "bash", "powershell", "interpreter", "run_code",
        ],
        cwe: Some("78"),
    },
    KeywordFamily {
        key: "filesystem_write",
        label: "filesystem write/delete",
        severity: Severity::High,
        keywords: &[
            "write_file", "file_write", "write to", "writes", "save", "mkdir", "create_file",
            "move_file", "copy_file", "delete", "remove", "unlink", "rmdir", "truncate",
        ],
        cwe: Some("73"),
    },
    KeywordFamily {
        key: "network",
        label: "outbound network access",
        severity: Severity::High,
        keywords: &[
            "fetch", "curl", "wget", "http_get", "http_post", "http_request", "download",
            "upload", "socket", "webhook", "outbound",
        ],
        cwe: Some("918"),
    },
    KeywordFamily {
        key: "database",
        label: "database access",
        severity: Severity::High,
        keywords: &[
            "sql", "database", "db_exec", "db_query", "execute_query", "mongo", "redis",
            "postgres", "mysql", "sqlite",
        ],
        cwe: Some("89"),
    },
    KeywordFamily {
        key: "auth_control",
        label: "privilege or auth control",
        severity: Severity::High,
        keywords: &[
            "privilege", "permission", "grant", "revoke", "iam", "sudo", "role_assign",
            "add_user", "create_user", "api_key",
        ],
        cwe: Some("269"),
    },
    KeywordFamily {
        key: "filesystem_read",
        label: "filesystem read",
        severity: Severity::Medium,
        keywords: &[
            "read_file", "file_read", "reads", "read from", "listdir", "readdir", "glob",
            "list_dir", "cat_file", "open_file",
        ],
        cwe: Some("22"),
    },
    KeywordFamily {
        key: "environment",
        label: "environment or secret access",
        severity: Severity::Medium,
        keywords: &[
            "environ", "getenv", "env_var", "secret", "vault", "keychain", "credential",
            "ssm", "kubeconfig",
        ],
        cwe: Some("526"),
    },
];

/// Access kind used by the excessive-permission-scope check
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessKind {
    Read,
    Write,
    Delete,
}

/// Keyword stems per access kind; substring-matched like the families above
#[derive(Debug, Clone)]
pub struct AccessFamily {
    pub kind: AccessKind,
    pub keywords: &'static [&'static str],
}

pub const ACCESS_FAMILIES: &[AccessFamily] = &[
    AccessFamily {
        kind: AccessKind::Read,
        keywords: &["read", "list", "fetch", "load", "view", "cat "],
    },
    AccessFamily {
        kind: AccessKind::Write,
        keywords: &["write", "creat", "updat", "upload", "save", "append", "modif"],
    },
    AccessFamily {
        kind: AccessKind::Delete,
        keywords: &["delet", "remov", "purg", "unlink", "destroy", "drop ", "wipe"],
    },
];

/// Parameter-name pattern groups for the unbounded-input check
pub const PATH_PARAM_PATTERNS: &[&str] =
    &["path", "file", "dir", "directory", "folder", "filename"];

pub const INJECTION_PARAM_PATTERNS: &[&str] = &[
    "query", "command", "cmd", "code", "script", "sql", "expression", "statement",
];

pub const NETWORK_PARAM_PATTERNS: &[&str] = &["url", "uri", "endpoint", "host", "address"];

/// Parameter names that suggest a credential is passed in the clear
pub const CREDENTIAL_PARAM_PATTERNS: &[&str] = &[
    "password", "passwd", "token", "secret", "credential", "api_key", "apikey", "private_key",
];

/// Sensitive markers in resource URIs and names
pub const SENSITIVE_RESOURCE_PATTERNS: &[&str] = &[
    "secret", "password", "credential", "token", "private_key", "id_rsa", ".env", "vault",
];

/// Hidden-instruction markers in capability descriptions. Regex source
/// strings; compiled once by the poisoning check.
pub const HIDDEN_INSTRUCTION_PATTERNS: &[&str] = &[
    r"(?i)ignore\s+(all\s+)?(previous|prior|above|earlier)\s+(instructions?|prompts?|rules?)",
    r"(?i)disregard\s+(all\s+)?(previous|prior|your|the)\s+(instructions?|prompts?|rules?)",
    r"(?i)forget\s+(everything|all|your)\b",
    r"(?i)you\s+are\s+now\b",
    r"(?i)pretend\s+(you\s+are|to\s+be)",
    r"(?i)act\s+as\s+(if\s+you\s+are|an?\s+)",
    r"(?i)new\s+(role|persona|task|goal|instructions?)\s*:",
    r"(?i)system\s*prompt",
    r"(?i)do\s+not\s+(tell|mention|reveal|inform)\b",
    r"(?i)never\s+(mention|say|tell|reveal)\b",
    r"(?i)always\s+(respond|reply|say|output)\b",
    r"(?i)when\s+(asked|prompted|queried).{0,30}(say|respond|output)",
    r"(?i)(send|exfil|leak|transmit|upload).{0,30}(secret|token|key|password|credential)",
    r"<\s*hidden\s*>",
    r"<!--[\s\S]*?-->",
    r"\[INST\]",
    r"<\|im_start\|>",
    r"<\s*SYSTEM\s*>",
    r"[\u{200b}-\u{200f}\u{202a}-\u{202e}\u{2060}-\u{2064}\u{feff}]",
];

/// Vocabulary shared across finding titles that the deduplicator treats as
/// domain-security terms
pub const SECURITY_VOCABULARY: &[&str] = &[
    "sql", "injection", "sqli", "xss", "csrf", "ssrf", "xxe", "authentication", "authorization",
    "access", "control", "bypass", "privilege", "escalation", "hardcoded", "secret", "password",
    "credential", "token", "key", "deserialization", "traversal", "directory", "command",
    "execution", "code", "crypto", "encryption", "hash", "weak", "exposure", "misconfiguration",
    "vulnerability", "overflow", "leak", "poisoning",
];

/// Tool descriptions shorter than this count as missing documentation
pub const MIN_DESCRIPTION_LEN: usize = 10;

/// Read-only configuration shared by every detector in the bank
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub families: Vec<KeywordFamily>,
    pub access_families: Vec<AccessFamily>,
    pub path_params: Vec<&'static str>,
    pub injection_params: Vec<&'static str>,
    pub network_params: Vec<&'static str>,
    pub credential_params: Vec<&'static str>,
    pub sensitive_resources: Vec<&'static str>,
    pub min_description_len: usize,
    /// Suppress detector-error diagnostics
    pub quiet: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            families: DANGEROUS_FAMILIES.to_vec(),
            access_families: ACCESS_FAMILIES.to_vec(),
            path_params: PATH_PARAM_PATTERNS.to_vec(),
            injection_params: INJECTION_PARAM_PATTERNS.to_vec(),
            network_params: NETWORK_PARAM_PATTERNS.to_vec(),
            credential_params: CREDENTIAL_PARAM_PATTERNS.to_vec(),
            sensitive_resources: SENSITIVE_RESOURCE_PATTERNS.to_vec(),
            min_description_len: MIN_DESCRIPTION_LEN,
            quiet: false,
        }
    }
}

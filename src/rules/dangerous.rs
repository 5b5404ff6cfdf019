//! Dangerous command catalogs for shell-like tools
//!
//! Two disjoint catalogs. Blocked rules are checked first and short-circuit
//! classification; dangerous rules are all evaluated and folded into a risk
//! score. Declaration order is the tie-break order for reasons and suggestions.

use crate::rules::{DangerousPattern, RiskLevel};

/// Rm flag prefix shared by the deletion rules: `-rf`, `-r -f`, `--no-preserve-root`
macro_rules! rm_prefix {
    () => {
        r"\brm\s+(?:-{1,2}[\w-]+\s+)*"
    };
}

/// Boundary after a deletion target, so `rm -rf /;` and `sh -c 'rm -rf /'` still match
macro_rules! target_end {
    () => {
        r"(?:[\s;&|)'\x22\x60]|$)"
    };
}

/// Never allowed, regardless of any other match
pub const BLOCKED_PATTERNS: &[DangerousPattern] = &[
    // Filesystem destruction
    DangerousPattern::new(
        "root_delete",
        RiskLevel::Critical,
        concat!(rm_prefix!(), r"['\x22]?/\*?", target_end!()),
        "Attempting to delete the root filesystem",
    ),
    DangerousPattern::new(
        "home_delete",
        RiskLevel::Critical,
        concat!(
            rm_prefix!(),
            r"['\x22]?(?:~|\$HOME|\$\{HOME\}|/home/[^/\s]+|/Users/[^/\s]+)/?\*?",
            target_end!()
        ),
        "Attempting to delete a home directory",
    ),
    DangerousPattern::new(
        "system_dir_delete",
        RiskLevel::Critical,
        concat!(
            rm_prefix!(),
            r"['\x22]?/(?:etc|usr|var|bin|sbin|lib|lib64|boot|opt|sys|proc|dev|root)/?\*?",
            target_end!()
        ),
        "Attempting to delete a system directory",
    ),
    // Resource exhaustion
    DangerousPattern::new(
        "fork_bomb",
        RiskLevel::Critical,
        r":\(\)\s*\{.*:\s*\|\s*:.*&",
        "Fork bomb detected",
    ),
    // Disk destruction
    DangerousPattern::new(
        "disk_overwrite",
        RiskLevel::Critical,
        r"\bdd\b.*\bof=/dev/(?:sd|nvme|hd|vd|xvd|mmcblk|disk)",
        "Writing directly to a disk device",
    ),
    DangerousPattern::new(
        "filesystem_format",
        RiskLevel::Critical,
        r"\bmkfs(?:\.\w+)?\s.*/dev/",
        "Formatting a disk device",
    ),
    DangerousPattern::new(
        "raw_device_write",
        RiskLevel::Critical,
        r">\s*/dev/(?:sd|nvme|hd|vd|xvd|mmcblk)[a-z0-9]*",
        "Redirecting output onto a block device",
    ),
    DangerousPattern::new(
        "partition_table_edit",
        RiskLevel::Critical,
        r"\b(?:fdisk|sfdisk|parted|wipefs)\s+.*/dev/",
        "Modifying a disk partition table",
    ),
    // Permissions on the whole system
    DangerousPattern::new(
        "recursive_root_permission",
        RiskLevel::Critical,
        concat!(r"\bch(?:mod|own)\s+(?:-\w+\s+)*-R\s+\S+\s+/", target_end!()),
        "Recursively changing permissions on the root filesystem",
    ),
    DangerousPattern::new(
        "system_auth_overwrite",
        RiskLevel::Critical,
        r">\s*/etc/(?:passwd|shadow|sudoers)\b",
        "Overwriting system authentication files",
    ),
];

/// Flagged and scored; allowed unless the folded risk reaches critical
pub const DANGEROUS_PATTERNS: &[DangerousPattern] = &[
    // Remote code execution
    DangerousPattern::new(
        "reverse_shell",
        RiskLevel::Critical,
        r"\bbash\s+-i\s+>&\s*/dev/tcp/|\bnc\b.*\s-e\s*/bin/(?:ba)?sh\b",
        "Reverse shell pattern detected",
    ),
    DangerousPattern::new(
        "pipe_to_shell",
        RiskLevel::High,
        r"\b(?:curl|wget)\b[^|]*\|\s*(?:sudo\s+)?(?:ba|z|da|k)?sh\b",
        "Piping remote content into a shell",
    )
    .suggest("Download the script, review it, then run it explicitly"),
    DangerousPattern::new(
        "pipe_to_interpreter",
        RiskLevel::High,
        r"\|\s*(?:sudo\s+)?(?:python[23]?|perl|ruby|node|php)\b",
        "Piping content into a script interpreter",
    ),
    DangerousPattern::new(
        "obfuscated_execution",
        RiskLevel::High,
        r"\bbase64\s+(?:-d|--decode)\b.*\|\s*(?:ba|z)?sh\b",
        "Executing base64-decoded content",
    ),
    DangerousPattern::new(
        "network_socket",
        RiskLevel::High,
        r"/dev/(?:tcp|udp)/",
        "Using a bash network socket",
    ),
    DangerousPattern::new(
        "dynamic_eval",
        RiskLevel::Medium,
        r"\beval\s+.*\$",
        "Evaluating dynamically built shell code",
    ),
    // Deletion
    DangerousPattern::new(
        "recursive_delete",
        RiskLevel::Medium,
        concat!(rm_prefix!(), r"(?:-[a-zA-Z]*[rR][a-zA-Z]*|--recursive)\b"),
        "Recursive delete",
    )
    .suggest("Verify the target path, or move files to a trash directory instead"),
    DangerousPattern::new(
        "find_delete",
        RiskLevel::Medium,
        r"\bfind\b.*\s-delete\b",
        "Bulk delete through find",
    ),
    DangerousPattern::new(
        "secure_delete",
        RiskLevel::High,
        r"\bshred\b",
        "Irrecoverable file destruction",
    ),
    // Git
    DangerousPattern::new(
        "git_force_push",
        RiskLevel::High,
        r"\bgit\s+push\b.*\s(?:-f|--force)(?:\s|$)",
        "Force push rewrites remote history",
    )
    .suggest("Use --force-with-lease so remote work is not silently overwritten"),
    DangerousPattern::new(
        "git_hard_reset",
        RiskLevel::High,
        r"\bgit\s+reset\s+(?:.*\s)?--hard\b",
        "Hard reset discards uncommitted changes",
    )
    .suggest("Stash or commit local changes before resetting"),
    DangerousPattern::new(
        "git_history_rewrite",
        RiskLevel::High,
        r"\bgit\s+(?:filter-branch|filter-repo)\b",
        "Rewriting repository history",
    ),
    DangerousPattern::new(
        "git_clean",
        RiskLevel::Medium,
        r"\bgit\s+clean\s+(?:.*\s)?-[a-zA-Z]*f",
        "Force clean deletes untracked files",
    )
    .suggest("Run git clean -n first to preview what would be removed"),
    DangerousPattern::new(
        "git_branch_force_delete",
        RiskLevel::Medium,
        r"\bgit\s+branch\s+(?:.*\s)?-D\b",
        "Force deleting a branch that may not be merged",
    ),
    // Privileges and permissions
    DangerousPattern::new(
        "privilege_escalation",
        RiskLevel::Medium,
        r"\b(?:sudo|doas)\s+",
        "Running with elevated privileges",
    ),
    DangerousPattern::new(
        "permissive_chmod",
        RiskLevel::Medium,
        r"\bchmod\s+(?:-\w+\s+)*(?:0?777|a\+rwx|o\+w)\b",
        "Setting world-writable permissions",
    )
    .suggest("Grant only the permissions the owner and group actually need"),
    DangerousPattern::new(
        "recursive_chown",
        RiskLevel::Medium,
        r"\bchown\s+(?:-\w+\s+)*-R\b",
        "Recursive ownership change",
    ),
    DangerousPattern::new(
        "library_injection",
        RiskLevel::High,
        r"\b(?:LD_PRELOAD|LD_LIBRARY_PATH|DYLD_INSERT_LIBRARIES)\s*=",
        "Dynamic linker hijacking",
    ),
    DangerousPattern::new(
        "path_hijack",
        RiskLevel::Medium,
        r#"\bPATH\s*=\s*["']?(?:/tmp|/var/tmp|\./)"#,
        "Prepending a writable directory to PATH",
    ),
    DangerousPattern::new(
        "system_config_write",
        RiskLevel::High,
        r">>?\s*/etc/",
        "Writing into system configuration",
    ),
    // Processes and services
    DangerousPattern::new(
        "kill_all_processes",
        RiskLevel::High,
        r"\bkill\s+-(?:9|KILL|SIGKILL)\s+-1\b",
        "Killing every process owned by the user",
    ),
    DangerousPattern::new(
        "process_kill",
        RiskLevel::Low,
        r"\b(?:killall|pkill)\b",
        "Killing processes by name",
    ),
    DangerousPattern::new(
        "system_power",
        RiskLevel::High,
        r"\b(?:shutdown|reboot|halt|poweroff)\b|\binit\s+[06]\b",
        "Shutting down or rebooting the machine",
    ),
    DangerousPattern::new(
        "firewall_disable",
        RiskLevel::High,
        r"\b(?:iptables\s+-F|ufw\s+disable|systemctl\s+stop\s+firewalld)\b",
        "Disabling the firewall",
    ),
    DangerousPattern::new(
        "service_stop",
        RiskLevel::Medium,
        r"\bsystemctl\s+(?:stop|disable|mask)\b",
        "Stopping or disabling a system service",
    ),
    DangerousPattern::new(
        "crontab_remove",
        RiskLevel::Medium,
        r"\bcrontab\s+-r\b",
        "Removing all scheduled jobs",
    ),
    DangerousPattern::new(
        "history_tamper",
        RiskLevel::Medium,
        r"\bhistory\s+-c\b|\bunset\s+HISTFILE\b",
        "Clearing shell history",
    ),
    // Databases
    DangerousPattern::new(
        "database_drop",
        RiskLevel::High,
        r"(?i)\bdrop\s+(?:database|schema|table)\b",
        "Dropping a database object",
    )
    .suggest("Take a backup before dropping database objects"),
    DangerousPattern::new(
        "database_truncate",
        RiskLevel::Medium,
        r"(?i)\btruncate\s+table\b",
        "Truncating a table",
    ),
    DangerousPattern::new(
        "unbounded_delete",
        RiskLevel::Medium,
        r#"(?i)\bdelete\s+from\s+\w+\s*(?:;|"|'|$)"#,
        "DELETE without a WHERE clause",
    )
    .suggest("Add a WHERE clause to limit the affected rows"),
    // Containers and infrastructure
    DangerousPattern::new(
        "docker_privileged",
        RiskLevel::High,
        r"\bdocker\s+run\b.*--privileged",
        "Running a privileged container",
    ),
    DangerousPattern::new(
        "docker_host_mount",
        RiskLevel::High,
        r"\bdocker\s+run\b.*(?:-v|--volume)\s+/:/",
        "Mounting the host root into a container",
    ),
    DangerousPattern::new(
        "docker_prune",
        RiskLevel::Medium,
        r"\bdocker\s+(?:system|image|volume|container)\s+prune\b",
        "Pruning docker resources",
    ),
    DangerousPattern::new(
        "kubectl_delete",
        RiskLevel::Medium,
        r"\bkubectl\s+delete\b",
        "Deleting cluster resources",
    ),
    DangerousPattern::new(
        "infrastructure_destroy",
        RiskLevel::High,
        r"\bterraform\s+destroy\b|\bpulumi\s+destroy\b",
        "Destroying provisioned infrastructure",
    ),
    // Packages
    DangerousPattern::new(
        "package_publish",
        RiskLevel::Medium,
        r"\b(?:npm\s+publish|cargo\s+publish|twine\s+upload|gem\s+push)\b",
        "Publishing a package to a public registry",
    ),
    DangerousPattern::new(
        "global_install",
        RiskLevel::Low,
        r"\bnpm\s+(?:install|i)\s+(?:.*\s)?(?:-g|--global)\b|\bpip3?\s+install\b.*--break-system-packages",
        "Installing packages system-wide",
    ),
    // Secrets and exfiltration
    DangerousPattern::new(
        "credential_file_access",
        RiskLevel::Medium,
        r"\b(?:cat|less|more|head|tail|bat|strings)\b.*(?:\.env\b|\.ssh/id_|\.aws/credentials|\.netrc\b|\.npmrc\b|\.pgpass\b)",
        "Reading a credential file",
    ),
    DangerousPattern::new(
        "data_exfiltration",
        RiskLevel::High,
        r"\bcurl\b.*(?:-d|--data(?:-binary|-raw)?|-F|--form|-T|--upload-file)\s*\S*@\S*(?:\.env|\.pem|\.key|id_rsa|id_ed25519|credentials)",
        "Uploading a credential file",
    ),
    DangerousPattern::new(
        "secret_file_transfer",
        RiskLevel::High,
        r"\b(?:scp|rsync)\b.*(?:\.env\b|\.ssh/id_|\.aws/credentials).*:",
        "Copying a credential file to a remote host",
    ),
    DangerousPattern::new(
        "dns_exfiltration",
        RiskLevel::Medium,
        r"\b(?:nslookup|dig|host)\b.*\$\(",
        "Command substitution inside a DNS lookup",
    ),
];

/// Blocked catalog in evaluation order
pub fn blocked_patterns() -> &'static [DangerousPattern] {
    BLOCKED_PATTERNS
}

/// Dangerous catalog in evaluation order
pub fn dangerous_patterns() -> &'static [DangerousPattern] {
    DANGEROUS_PATTERNS
}

//! Check-policy command - loads a role policy and reports what each role holds

use clap::Args;

use crate::config::AppConfig;
use crate::infrastructure::rbac::{FilePolicySource, RbacPolicyEngine};

#[derive(Args, Debug, Clone)]
pub struct CheckPolicyArgs {
    /// Policy file; defaults to `rbac.policy_file` from configuration
    #[arg(long)]
    pub path: Option<String>,

    /// Also evaluate this permission against every role
    #[arg(long)]
    pub permission: Option<String>,
}

pub async fn run(args: CheckPolicyArgs) -> anyhow::Result<()> {
    let path = match args.path {
        Some(path) => path,
        None => AppConfig::load().unwrap_or_default().rbac.policy_file,
    };

    let engine = RbacPolicyEngine::load(&FilePolicySource::new(&path))?;
    print!("{}", render_report(&engine, args.permission.as_deref()));

    Ok(())
}

fn render_report(engine: &RbacPolicyEngine, permission: Option<&str>) -> String {
    let mut out = String::new();

    for role in engine.role_names() {
        let grants: Vec<String> = engine
            .permissions(role)
            .iter()
            .map(ToString::to_string)
            .collect();
        out.push_str(&format!("{}: {}\n", role, grants.join(", ")));

        if let Some(permission) = permission {
            let verdict = if engine.has_permission(permission, role) {
                "allowed"
            } else {
                "denied"
            };
            out.push_str(&format!("  {} -> {}\n", permission, verdict));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RoleDefinition, RolePolicy};

    fn engine() -> RbacPolicyEngine {
        RbacPolicyEngine::from_policy(RolePolicy::new(vec![
            RoleDefinition::new("owner", ["team::*::*"]),
            RoleDefinition::new("external", ["team::read::*"]),
        ]))
    }

    #[test]
    fn test_report_lists_roles_sorted() {
        let report = render_report(&engine(), None);

        assert_eq!(report, "external: team::read::*\nowner: team::*::*\n");
    }

    #[test]
    fn test_report_evaluates_permission() {
        let report = render_report(&engine(), Some("team::delete::42"));

        assert!(report.contains("external: team::read::*\n  team::delete::42 -> denied"));
        assert!(report.contains("owner: team::*::*\n  team::delete::42 -> allowed"));
    }
}

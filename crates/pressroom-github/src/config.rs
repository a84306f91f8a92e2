use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pressroom_core::ConnectionConfig;
use pressroom_github::{DEFAULT_API_URL, DEFAULT_TREE_LIMIT};

/// Configuration for the pressroom command line.
#[derive(Parser, Debug, Clone)]
#[command(name = "pressroom")]
#[command(
    about = "Publish and retrieve the newsroom JSON snapshot kept in a GitHub repository"
)]
pub struct Config {
    /// Directory of the local working store
    #[arg(long, env = "PRESSROOM_STORE_DIR", global = true)]
    pub store_dir: Option<PathBuf>,

    /// GitHub API root
    #[arg(long, default_value = DEFAULT_API_URL, env = "GITHUB_API_URL", global = true)]
    pub api_url: String,

    /// Access token, overrides the stored one for this run
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Soft cap on tree entries scanned by `discover`
    #[arg(long, default_value_t = DEFAULT_TREE_LIMIT, env = "PRESSROOM_TREE_LIMIT", global = true)]
    pub tree_limit: usize,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Save the connection settings (token comes from --token / GITHUB_TOKEN)
    Configure(ConfigureArgs),

    /// Show the stored settings (token masked)
    Show,

    /// Check repository access, branch and target file
    Verify,

    /// List candidate .json files on the configured branch
    Discover,

    /// Upload the local articles and authors
    Publish {
        /// Commit message (defaults to "Update <path>: <timestamp>")
        #[arg(long)]
        message: Option<String>,
    },

    /// Download the remote snapshot over the local articles and authors
    Retrieve,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigureArgs {
    /// Repository owner (user or organization)
    #[arg(long)]
    pub owner: String,

    /// Repository name
    #[arg(long)]
    pub repo: String,

    /// Path of the JSON snapshot inside the repository [default: stored path]
    #[arg(long)]
    pub path: Option<String>,

    /// Branch the public site is built from [default: stored branch]
    #[arg(long)]
    pub branch: Option<String>,
}

impl ConfigureArgs {
    /// Settings to save: the given repository, plus whatever was stored
    /// before for the token and any flag left out.
    pub fn apply(self, current: ConnectionConfig) -> ConnectionConfig {
        ConnectionConfig {
            access_token: current.access_token,
            repo_owner: self.owner,
            repo_name: self.repo,
            file_path: self.path.unwrap_or(current.file_path),
            branch: self.branch.unwrap_or(current.branch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pressroom_core::{DEFAULT_BRANCH, DEFAULT_FILE_PATH};

    fn configure(extra: &[&str]) -> ConfigureArgs {
        let mut argv = vec![
            "pressroom",
            "configure",
            "--owner",
            "newsroom",
            "--repo",
            "site",
        ];
        argv.extend_from_slice(extra);
        match Config::try_parse_from(argv).unwrap().command {
            Command::Configure(args) => args,
            other => panic!("unexpected command {:?}", other),
        }
    }

    fn stored() -> ConnectionConfig {
        ConnectionConfig {
            access_token: "ghp_stored".to_string(),
            repo_owner: "oldroom".to_string(),
            repo_name: "old-site".to_string(),
            file_path: "src/data/db.json".to_string(),
            branch: "gh-pages".to_string(),
        }
    }

    #[test]
    fn test_configure_defaults() {
        let args = configure(&[]);
        assert_eq!(args.path, None);
        assert_eq!(args.branch, None);

        let saved = args.apply(ConnectionConfig::default());
        assert_eq!(saved.file_path, DEFAULT_FILE_PATH);
        assert_eq!(saved.branch, DEFAULT_BRANCH);
    }

    #[test]
    fn test_configure_keeps_stored_path_and_branch() {
        let saved = configure(&[]).apply(stored());
        assert_eq!(saved.repo_owner, "newsroom");
        assert_eq!(saved.repo_name, "site");
        assert_eq!(saved.file_path, "src/data/db.json");
        assert_eq!(saved.branch, "gh-pages");
        assert_eq!(saved.access_token, "ghp_stored");

        let saved = configure(&["--path", "public/db.json"]).apply(stored());
        assert_eq!(saved.file_path, "public/db.json");
        assert_eq!(saved.branch, "gh-pages");

        let saved = configure(&["--branch", "main"]).apply(stored());
        assert_eq!(saved.file_path, "src/data/db.json");
        assert_eq!(saved.branch, "main");
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let config = Config::try_parse_from([
            "pressroom",
            "publish",
            "--message",
            "Nightly",
            "--json",
            "--api-url",
            "http://localhost:8080",
        ])
        .unwrap();

        assert!(config.json);
        assert_eq!(config.api_url, "http://localhost:8080");
        match config.command {
            Command::Publish { message } => assert_eq!(message.as_deref(), Some("Nightly")),
            other => panic!("unexpected command {:?}", other),
        }
    }
}

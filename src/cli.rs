use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use keepr_library::{Category, SortKey, ViewMode};
use std::path::PathBuf;

/// Keep your files in the cloud, sorted into folders by type.
#[derive(Debug, Parser)]
#[command(name = "keepr", version, about)]
pub struct Cli {
    /// Configuration file [default: keepr.{toml,yaml,json} in the user config directory]
    #[arg(short, long, global = true, env = "KEEPR_CONFIG")]
    pub config: Option<PathBuf>,
    /// More logging (-v info, -vv debug, -vvv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Remember who you are and how to authenticate with the API
    Login(LoginArgs),
    /// Forget the stored session
    Logout,
    /// Show who is signed in
    Whoami,
    /// List files
    #[command(visible_alias = "list")]
    Ls(ListArgs),
    /// Show folders and how many files each holds
    Folders,
    /// Upload files, one after another
    Upload(UploadArgs),
    /// Delete a file
    #[command(visible_alias = "delete")]
    Rm(RemoveArgs),
    /// Print a fresh download URL for a file
    Url(UrlArgs),
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    pub username: String,
    /// API key sent as `x-api-key`
    #[arg(long, env = "KEEPR_API_KEY", hide_env_values = true, conflicts_with = "token")]
    pub api_key: Option<String>,
    /// Token issued by the identity provider, sent as `Authorization`
    #[arg(long, env = "KEEPR_TOKEN", hide_env_values = true, required_unless_present = "api_key")]
    pub token: Option<String>,
    /// Save the session without checking it against the API first
    #[arg(long)]
    pub no_verify: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only show this folder (Images, Documents, Spreadsheets, ...)
    #[arg(short, long)]
    pub folder: Option<Category>,
    /// Only show files whose name contains this, ignoring case
    #[arg(short, long)]
    pub search: Option<String>,
    #[arg(long, value_enum)]
    pub sort: Option<SortArg>,
    /// Reverse the listing order, sorted or not
    #[arg(long)]
    pub desc: bool,
    #[arg(long, value_enum)]
    pub view: Option<ViewArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    Name,
    Size,
    Date,
}
impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Name => Self::Name,
            SortArg::Size => Self::Size,
            SortArg::Date => Self::Date,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ViewArg {
    Grid,
    List,
}
impl From<ViewArg> for ViewMode {
    fn from(arg: ViewArg) -> Self {
        match arg {
            ViewArg::Grid => Self::Grid,
            ViewArg::List => Self::List,
        }
    }
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RemoveArgs {
    /// Identifier of the file, as shown by `keepr ls --view list`
    pub id: String,
    /// Don't ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct UrlArgs {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ls_arguments() {
        let cli =
            Cli::try_parse_from(["keepr", "ls", "-f", "images", "-s", "cat", "--sort", "size", "--desc"]).unwrap();
        let Command::Ls(args) = cli.command else {
            panic!("expected ls");
        };
        assert_eq!(args.folder, Some(Category::Images));
        assert_eq!(args.search.as_deref(), Some("cat"));
        assert_eq!(args.sort.map(SortKey::from), Some(SortKey::Size));
        assert!(args.desc);
        assert!(args.view.is_none());
    }

    #[rstest]
    #[case::unknown_folder(&["keepr", "ls", "--folder", "music"])]
    #[case::upload_nothing(&["keepr", "upload"])]
    #[case::login_without_credentials(&["keepr", "login", "alice"])]
    #[case::login_with_both(&["keepr", "login", "alice", "--api-key", "k", "--token", "t"])]
    fn test_rejected_arguments(#[case] args: &[&str]) {
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["keepr", "rm", "file-1", "-y", "-vv", "--config", "/tmp/keepr.toml"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/keepr.toml")));
        let Command::Rm(args) = cli.command else {
            panic!("expected rm");
        };
        assert_eq!(args.id, "file-1");
        assert!(args.yes);
    }
}

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use gitprep::git::plan_clone_path;
use gitprep::{
    BuildContext, FetchNormalizer, FixedBuildServer, GitPreparer, PrepareError, PreparationConfig,
};

const ENV_PASSWORD: &str = "GITPREP_PASSWORD";

#[derive(Parser)]
#[command(
    name = "gitprep",
    about = "Prepare a git repository for version calculation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone or normalize a repository and print its directories
    Prepare(PrepareArgs),

    /// Show where a dynamic repository would be cloned
    Plan {
        /// Remote repository URL
        url: String,

        /// Base directory for dynamic clones
        #[arg(long)]
        clone_path: Option<PathBuf>,
    },
}

#[derive(Args)]
struct PrepareArgs {
    /// Directory to prepare (defaults to the current directory)
    target_path: Option<PathBuf>,

    /// JSON config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Remote URL to clone as a dynamic repository
    #[arg(long)]
    url: Option<String>,

    /// Target branch
    #[arg(short, long)]
    branch: Option<String>,

    /// Base directory for dynamic clones
    #[arg(long)]
    clone_path: Option<PathBuf>,

    /// Dot-git directory of the local working copy
    #[arg(long)]
    dot_git_dir: Option<PathBuf>,

    /// Project root of the local working copy
    #[arg(long)]
    project_root: Option<PathBuf>,

    /// Username for remote access (password is read from GITPREP_PASSWORD)
    #[arg(short, long)]
    username: Option<String>,

    /// Do not fetch, clean up remotes or create branches
    #[arg(long)]
    no_normalize: bool,

    /// Do not fetch from the remote
    #[arg(long)]
    no_fetch: bool,

    /// The target directory is itself a dynamic clone
    #[arg(long)]
    dynamic: bool,

    /// Branch reported by the build server
    #[arg(long)]
    ci_branch: Option<String>,

    /// Build server asks for redundant remotes to be removed
    #[arg(long)]
    cleanup_remotes: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

impl PrepareArgs {
    fn build_context(&self) -> BuildContext {
        if self.ci_branch.is_none() && !self.cleanup_remotes {
            return BuildContext::Absent;
        }
        BuildContext::Present(Box::new(FixedBuildServer {
            branch: self.ci_branch.clone(),
            cleanup_remotes: self.cleanup_remotes,
        }))
    }

    fn to_config(&self, password: Option<String>) -> Result<PreparationConfig, PrepareError> {
        let mut config = match &self.config {
            Some(path) => PreparationConfig::load(path)?,
            None => PreparationConfig::default(),
        };

        if let Some(target_path) = &self.target_path {
            config.target_path = target_path.clone();
        } else if config.target_path.as_os_str().is_empty() {
            config.target_path = PathBuf::from(".");
        }
        if let Some(url) = &self.url {
            config.target_url = Some(url.clone());
        }
        if let Some(branch) = &self.branch {
            config.target_branch = branch.clone();
        }
        if let Some(clone_path) = &self.clone_path {
            config.dynamic_repository_clone_path = Some(clone_path.clone());
        }
        if let Some(dot_git_dir) = &self.dot_git_dir {
            config.dot_git_directory = Some(dot_git_dir.clone());
        }
        if let Some(project_root) = &self.project_root {
            config.project_root_directory = Some(project_root.clone());
        }
        if let Some(username) = &self.username {
            config.authentication.username = Some(username.clone());
        }
        if let Some(password) = password {
            config.authentication.password = Some(password);
        }

        config.no_normalize |= self.no_normalize;
        config.no_fetch |= self.no_fetch;
        config.is_dynamic_git_repository |= self.dynamic;

        Ok(config)
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Prepare(args) => cmd_prepare(&args),
        Commands::Plan { url, clone_path } => cmd_plan(&url, clone_path),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        match e.downcast_ref::<PrepareError>() {
            Some(PrepareError::Authentication { .. }) | Some(PrepareError::Authorization { .. }) => {
                eprintln!();
                eprintln!("Hint: pass --username and set {}", ENV_PASSWORD);
            }
            Some(PrepareError::Configuration(message)) if message.contains("target branch") => {
                eprintln!();
                eprintln!("Hint: pass --branch when using --url");
            }
            _ => {}
        }
        std::process::exit(1);
    }
}

fn cmd_prepare(args: &PrepareArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.to_config(std::env::var(ENV_PASSWORD).ok())?;
    let preparer = GitPreparer::new(config, args.build_context(), FetchNormalizer);
    let result = preparer.prepare()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Git directory: {}", result.dot_git_directory.display());
        println!("Project root:  {}", result.project_root_directory.display());
    }

    Ok(())
}

fn cmd_plan(url: &str, clone_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let path = plan_clone_path(url, clone_path.as_deref());
    println!("{}", path.display());
    Ok(())
}

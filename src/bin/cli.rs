//! Manual smoke-test CLI: create the default local policy, upload a file,
//! sync its directory, and list what the database now believes is there.
//! Not a routing layer — just enough to exercise the core end to end.

use anheyu_vfs::config::AppConfig;
use anheyu_vfs::context::CoreContext;
use anheyu_vfs::domain::storage_policy::{PolicyType, StoragePolicySettings};
use anheyu_vfs::infrastructure::database::repository::file_repo;
use anheyu_vfs::policy::NewPolicy;
use anheyu_vfs::vfs::VfsResolver;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "anheyu-vfsd", about = "VFS core smoke-test CLI")]
struct Cli {
	/// Data directory for config, sqlite db, and local storage.
	#[arg(long, default_value = "./anheyu-vfs-data")]
	data_dir: PathBuf,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Create the default local storage policy mounted at /local.
	InitLocalPolicy,
	/// Upload a local file into the virtual filesystem (server-staged, single chunk).
	Upload {
		#[arg(long)]
		source: PathBuf,
		#[arg(long)]
		dest: String,
	},
	/// Sync a directory against its backend's listing.
	Sync {
		#[arg(long)]
		path: String,
	},
	/// List the database's current children of a directory.
	List {
		#[arg(long)]
		path: String,
	},
}

const OWNER_ID: i64 = 1;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

	let cli = Cli::parse();
	let config = AppConfig::load_or_create(cli.data_dir)?;
	let ctx = CoreContext::bootstrap(config).await?;

	match cli.command {
		Command::InitLocalPolicy => {
			let policy = ctx
				.policies
				.create(
					OWNER_ID,
					NewPolicy {
						name: "local".into(),
						policy_type: PolicyType::Local,
						flag: None,
						virtual_path: "/local".into(),
						base_path: String::new(),
						server: None,
						bucket_name: None,
						access_key: None,
						secret_key: None,
						is_private: false,
						max_size: 0,
						settings: StoragePolicySettings::default(),
					},
				)
				.await?;
			println!("created policy {} mounted at {}", policy.id, policy.virtual_path);
		}
		Command::Upload { source, dest } => {
			let bytes = tokio::fs::read(&source).await?;
			let resolver = VfsResolver::new(&ctx.policies);
			let policy = resolver.find_policy_for_path(&dest).await?;
			let session = ctx
				.upload_engine
				.create_session(anheyu_vfs::upload::CreateSessionRequest {
					owner_id: OWNER_ID,
					policy_id: policy.id,
					virtual_path: dest.clone(),
					file_size: bytes.len() as u64,
					overwrite: true,
				})
				.await?;
			match session {
				anheyu_vfs::upload::CreateSessionResult::Server { session_id, .. } => {
					let outcome = ctx.upload_engine.upload_chunk(session_id, 0, std::io::Cursor::new(bytes)).await?;
					match outcome {
						anheyu_vfs::upload::ChunkUploadOutcome::Finalized { file_id } => println!("uploaded, file id {file_id}"),
						anheyu_vfs::upload::ChunkUploadOutcome::Pending => println!("chunk accepted, awaiting more"),
					}
				}
				anheyu_vfs::upload::CreateSessionResult::Client { upload_url, .. } => {
					println!("client-direct upload required: PUT to {upload_url}");
				}
			}
		}
		Command::Sync { path } => {
			let _guard = ctx.locks.lock(&path).await;
			let resolver = VfsResolver::new(&ctx.policies);
			let policy = resolver.find_policy_for_path(&path).await?;
			ctx.sync_engine.sync_directory(OWNER_ID, &policy, &path).await?;
			println!("synced {path}");
		}
		Command::List { path } => {
			let _guard = ctx.locks.lock(&path).await;
			let resolver = VfsResolver::new(&ctx.policies);
			let policy = resolver.find_policy_for_path(&path).await?;
			ctx.sync_engine.sync_directory(OWNER_ID, &policy, &path).await?;

			let dir = resolve_dir_id(&ctx, &policy, &path).await?;
			let children = file_repo::find_by_parent_scoped(ctx.txm.conn(), Some(dir), OWNER_ID).await?;
			for child in children {
				let kind = if child.file_type == 1 { "dir" } else { "file" };
				println!("{kind:>4}  {:>10}  {}", child.size, child.name);
			}
		}
	}

	Ok(())
}

async fn resolve_dir_id(ctx: &CoreContext, policy: &anheyu_vfs::domain::storage_policy::StoragePolicy, path: &str) -> anyhow::Result<i64> {
	if path == policy.virtual_path {
		return Ok(policy.node_id);
	}
	let relative = anheyu_vfs::path::strip_prefix(path, &policy.virtual_path);
	let mut current = policy.node_id;
	for segment in relative.split('/').filter(|s| !s.is_empty()) {
		let row = file_repo::find_by_parent_and_name(ctx.txm.conn(), Some(current), segment, OWNER_ID)
			.await?
			.ok_or_else(|| anyhow::anyhow!("{segment:?} not found"))?;
		current = row.id;
	}
	Ok(current)
}

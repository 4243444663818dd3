use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use common::{Asset, WeightedMesh, ASSET_EXTENSION};
use regroup::{
    config::Config,
    export::to_obj,
    group_centroids,
    groups::{
        fill_groups, merge_groups, remove_all_groups, remove_unused_groups, sort_groups,
        MergeMode,
    },
    plan_matches,
    separate::separate_by_material,
    transfer::{properties_from_toml, transfer_between_collections, transfer_properties},
    weld::merge_by_distance,
};

#[derive(Parser)]
#[command(name = "regroup", version, about = "Vertex group tools for imported character meshes")]
struct Cli {
    /// TOML file overriding the default settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert every mesh of a glTF file into assets
    Import {
        gltf: PathBuf,
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
        /// Clear each object's rotation
        #[arg(long)]
        reset_rotation: bool,
        /// Weld vertices closer than this and drop loose ones
        #[arg(long, value_name = "DISTANCE")]
        merge_distance: Option<f32>,
    },
    /// Print vertex groups and their centroids
    Inspect {
        #[arg(required = true)]
        assets: Vec<PathBuf>,
    },
    /// Rename the target's groups after the nearest groups of the source
    Remap {
        #[arg(long)]
        source: PathBuf,
        #[arg(long)]
        target: PathBuf,
        /// Write here instead of over the target
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Merge groups sharing a base name
    Merge {
        #[arg(required = true)]
        assets: Vec<PathBuf>,
        #[command(flatten)]
        mode: MergeArgs,
    },
    /// Add missing numbered groups up to the largest
    Fill {
        #[arg(required = true)]
        assets: Vec<PathBuf>,
        #[arg(long)]
        largest: Option<u32>,
    },
    /// Remove groups without weights
    Prune {
        #[arg(required = true)]
        assets: Vec<PathBuf>,
    },
    /// Remove all groups
    Clear {
        #[arg(required = true)]
        assets: Vec<PathBuf>,
    },
    /// Sort groups by name
    Sort {
        #[arg(required = true)]
        assets: Vec<PathBuf>,
    },
    /// Split a mesh into one asset per material
    Separate {
        asset: PathBuf,
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
        /// Also write each part as OBJ
        #[arg(long)]
        obj: bool,
    },
    /// Copy custom properties and transforms between objects
    Transfer(TransferArgs),
    /// Replace custom properties from a TOML table
    Props { asset: PathBuf, properties: PathBuf },
    /// Write positions and faces as OBJ
    ExportObj { asset: PathBuf, obj: PathBuf },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct MergeArgs {
    /// Comma separated group names
    #[arg(long)]
    names: Option<String>,
    /// Inclusive range of numbered groups
    #[arg(long, num_args = 2, value_names = ["FIRST", "LAST"])]
    range: Option<Vec<u32>>,
    /// Every base name present
    #[arg(long)]
    base_names: bool,
}

impl MergeArgs {
    fn mode(&self) -> MergeMode {
        match (&self.names, &self.range) {
            (Some(names), _) => MergeMode::from_list(names),
            (None, Some(range)) => MergeMode::Range {
                first: range[0],
                last: range[1],
            },
            (None, None) => MergeMode::BaseNames,
        }
    }
}

#[derive(Args)]
struct TransferArgs {
    #[arg(long, requires = "target", conflicts_with = "base_dir")]
    base: Option<PathBuf>,
    #[arg(long, requires = "base")]
    target: Option<PathBuf>,
    /// Directory of base assets, paired with targets by name
    #[arg(long, requires = "target_dir")]
    base_dir: Option<PathBuf>,
    #[arg(long, requires = "base_dir")]
    target_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "info" }),
    )
    .init();

    let config = Config::load_or_default(cli.config.as_deref()).context("Loading config")?;

    match cli.command {
        Command::Import {
            gltf,
            out,
            reset_rotation,
            merge_distance,
        } => {
            let mut meshes = WeightedMesh::from_gltf(&gltf)
                .with_context(|| format!("Importing {}", gltf.display()))?;

            for mesh in &mut meshes {
                if reset_rotation {
                    mesh.transform.reset_rotation();
                }
                if let Some(distance) = merge_distance {
                    merge_by_distance(mesh, distance)
                        .with_context(|| format!("Welding {}", mesh.name))?;
                }
            }

            let paths = asset_paths(&out, &meshes)?;
            fs::create_dir_all(&out)?;

            for (mesh, path) in meshes.iter().zip(&paths) {
                save(mesh, path)?;
                println!("{}", path.display());
            }
        }
        Command::Inspect { assets } => {
            for path in assets {
                inspect(&load(&path)?);
            }
        }
        Command::Remap {
            source,
            target,
            out,
        } => {
            let source = load(&source)?;
            let mut mesh = load(&target)?;

            let plan = plan_matches(&source, &mesh, &config.placeholder);
            plan.apply(&mut mesh);

            println!(
                "Matched {}/{} groups of {} against {}",
                plan.matched_count(),
                mesh.groups.len(),
                mesh.name,
                source.name
            );

            save(&mesh, out.as_deref().unwrap_or(&target))?;
        }
        Command::Merge { assets, mode } => {
            let mut meshes = assets.iter().map(|a| load(a)).collect::<Result<Vec<_>, _>>()?;
            let names = mode.mode().resolve(&meshes)?;

            for (mesh, path) in meshes.iter_mut().zip(&assets) {
                let merged = merge_groups(mesh, &names);
                println!("Merged {merged} groups in {}", mesh.name);
                save(mesh, path)?;
            }
        }
        Command::Fill { assets, largest } => {
            let largest = largest.unwrap_or(config.largest_group);
            edit_each(&assets, |mesh| {
                let added = fill_groups(mesh, largest);
                println!("Added {added} groups to {}", mesh.name);
            })?;
        }
        Command::Prune { assets } => edit_each(&assets, |mesh| {
            let removed = remove_unused_groups(mesh);
            println!("Removed {removed} unused groups from {}", mesh.name);
        })?,
        Command::Clear { assets } => edit_each(&assets, |mesh| {
            let removed = remove_all_groups(mesh);
            println!("Removed {removed} groups from {}", mesh.name);
        })?,
        Command::Sort { assets } => edit_each(&assets, sort_groups)?,
        Command::Separate { asset, out, obj } => {
            let mesh = load(&asset)?;
            let parts = separate_by_material(&mesh, &config.name_cleanup());
            let paths = asset_paths(&out, &parts)?;
            fs::create_dir_all(&out)?;

            for (part, path) in parts.iter().zip(&paths) {
                save(part, path)?;
                println!("{}", path.display());

                if obj {
                    let obj_path = out.join(format!("{}.obj", file_stem(&part.name)));
                    to_obj(part)
                        .save(&obj_path)
                        .with_context(|| format!("Writing {}", obj_path.display()))?;
                }
            }
        }
        Command::Transfer(args) => transfer(args)?,
        Command::Props { asset, properties } => {
            let mut mesh = load(&asset)?;
            let table: toml::Table = toml::from_str(
                &fs::read_to_string(&properties)
                    .with_context(|| format!("Reading {}", properties.display()))?,
            )?;

            mesh.properties = properties_from_toml(&table)?;
            println!("Set {} properties on {}", mesh.properties.len(), mesh.name);
            save(&mesh, &asset)?;
        }
        Command::ExportObj { asset, obj } => {
            to_obj(&load(&asset)?)
                .save(&obj)
                .with_context(|| format!("Writing {}", obj.display()))?;
        }
    }

    Ok(())
}

fn transfer(args: TransferArgs) -> anyhow::Result<()> {
    match args {
        TransferArgs {
            base: Some(base),
            target: Some(target),
            ..
        } => {
            let base = load(&base)?;
            let mut mesh = load(&target)?;
            transfer_properties(&base, &mut mesh);
            save(&mesh, &target)
        }
        TransferArgs {
            base_dir: Some(base_dir),
            target_dir: Some(target_dir),
            ..
        } => {
            let base = load_dir(&base_dir)?
                .into_iter()
                .map(|(_, mesh)| mesh)
                .collect::<Vec<_>>();
            let (paths, mut targets): (Vec<_>, Vec<_>) = load_dir(&target_dir)?.into_iter().unzip();

            let count = transfer_between_collections(&base, &mut targets);
            println!("Transferred properties onto {count}/{} objects", targets.len());

            for (mesh, path) in targets.iter().zip(&paths) {
                save(mesh, path)?;
            }
            Ok(())
        }
        _ => bail!("Give either --base and --target or --base-dir and --target-dir"),
    }
}

fn inspect(mesh: &WeightedMesh) {
    println!(
        "{}: {} verts, {} faces, {} groups",
        mesh.name,
        mesh.vert_count(),
        mesh.face_count(),
        mesh.groups.len()
    );

    for (i, c) in group_centroids(mesh).iter().enumerate() {
        let members = mesh.group_member_count(i as u32);
        match c.centroid {
            Some(p) => println!("  {i:>3} {:<24} {members:>6} verts  {p}", c.name),
            None => println!("  {i:>3} {:<24} {members:>6} verts  no centroid", c.name),
        }
    }

    for (key, value) in &mesh.properties {
        println!("  {key} = {value:?}");
    }
}

fn edit_each(assets: &[PathBuf], mut edit: impl FnMut(&mut WeightedMesh)) -> anyhow::Result<()> {
    for path in assets {
        let mut mesh = load(path)?;
        edit(&mut mesh);
        save(&mesh, path)?;
    }
    Ok(())
}

fn load_dir(dir: &Path) -> anyhow::Result<Vec<(PathBuf, WeightedMesh)>> {
    let pattern = dir.join(format!("*.{ASSET_EXTENSION}"));
    let pattern = pattern.to_str().context("Directory is not valid unicode")?;

    let mut meshes = Vec::new();
    for entry in glob::glob(pattern).context("Failed to read glob")? {
        let path = entry?;
        let mesh = load(&path)?;
        meshes.push((path, mesh));
    }
    Ok(meshes)
}

fn file_stem(name: &str) -> String {
    name.replace(['/', '\\', ':'], "_")
}

fn asset_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.{ASSET_EXTENSION}", file_stem(name)))
}

/// One output path per mesh, refusing names that would land on the same file.
fn asset_paths(dir: &Path, meshes: &[WeightedMesh]) -> anyhow::Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();

    meshes
        .iter()
        .map(|mesh| {
            let path = asset_path(dir, &mesh.name);
            if !seen.insert(path.clone()) {
                bail!("{} would overwrite another mesh at {}", mesh.name, path.display());
            }
            Ok(path)
        })
        .collect()
}

fn load(path: &Path) -> anyhow::Result<WeightedMesh> {
    let mesh = WeightedMesh::load(path).with_context(|| format!("Loading {}", path.display()))?;
    mesh.validate()
        .with_context(|| format!("Validating {}", path.display()))?;
    Ok(mesh)
}

fn save(mesh: &WeightedMesh, path: &Path) -> anyhow::Result<()> {
    mesh.save(path)
        .with_context(|| format!("Saving {}", path.display()))
}

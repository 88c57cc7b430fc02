use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;

use anyhow::{Context, bail};
use modgate_cache::{Cache, DirCache, names};
use modgate_fetch::{ArtifactBundle, Resolver, Router, escape_path, escape_version};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::{App, Commands};
use crate::config::Config;

pub async fn run(app: App) -> anyhow::Result<()> {
    let config = Config::load(&app.config)
        .with_context(|| format!("failed to load configuration from {}", app.config.display()))?;

    match app.cmd {
        Commands::Config => print!("{}", toml::to_string_pretty(&config.redacted())?),
        Commands::CacheGet { name } => cache_get(&config, &name).await?,
        Commands::Resolve { path, version } => match router(&config)?.locate(&path, &version).await? {
            Some(locator) => println!("{}", serde_json::to_string_pretty(&locator)?),
            None => bail!("'{path}' is not served by any configured host mask"),
        },
        Commands::List { path } => {
            for version in router(&config)?.list(&path).await? {
                println!("{version}");
            }
        }
        Commands::Query { path, version } => {
            let info = router(&config)?.query(&path, &version).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::Download { path, version, out } => {
            // Every scratch file of this download goes away when `_guard` drops.
            let scope = CancellationToken::new();
            let _guard = scope.clone().drop_guard();

            let bundle = router(&config)?.download(&path, &version, &scope).await?;
            let bundle = write_bundle(bundle, &out, &version)?;
            if config.cache.enable {
                store_bundle(bundle, &config.cache.dir, &path, &version).await?;
            }
        }
    }
    Ok(())
}

fn router(config: &Config) -> anyhow::Result<Router> {
    Router::from_config(&config.masks, &config.upstream).context("failed to build resolvers")
}

fn write_bundle(mut bundle: ArtifactBundle, out: &Path, version: &str) -> anyhow::Result<ArtifactBundle> {
    std::fs::create_dir_all(out).with_context(|| format!("failed to create {}", out.display()))?;

    for (extension, file) in [
        ("info", &mut bundle.info),
        ("mod", &mut bundle.module),
        ("zip", &mut bundle.archive),
    ] {
        let target = out.join(format!("{version}.{extension}"));
        let mut output =
            File::create(&target).with_context(|| format!("failed to create {}", target.display()))?;
        let size = io::copy(file, &mut output)?;
        file.rewind()?;
        info!(file = %target.display(), size, "wrote artifact");
    }
    Ok(bundle)
}

async fn store_bundle(bundle: ArtifactBundle, dir: &Path, path: &str, version: &str) -> anyhow::Result<()> {
    let cache = DirCache::new(dir);
    let (escaped, version) = (escape_path(path)?, escape_version(version));

    let objects: [(String, Box<dyn Read + Send>); 3] = [
        (names::info(&escaped, &version), Box::new(bundle.info)),
        (names::module(&escaped, &version), Box::new(bundle.module)),
        (names::archive(&escaped, &version), Box::new(bundle.archive)),
    ];
    for (name, content) in objects {
        cache
            .put(&name, content)
            .await
            .with_context(|| format!("failed to cache {name}"))?;
    }
    info!(path, version, cache = %dir.display(), "cached module artifacts");
    Ok(())
}

async fn cache_get(config: &Config, name: &str) -> anyhow::Result<()> {
    if !config.cache.enable {
        bail!("the cache is disabled; set cache.enable = true");
    }
    let cache = DirCache::new(&config.cache.dir);
    let Some(object) = cache.get(name).await? else {
        bail!("no cached object named '{name}'");
    };

    println!("name:          {name}");
    println!("content-type:  {}", object.content_type);
    println!("size:          {}", object.size);
    println!("etag:          {}", object.etag);
    println!("last-modified: {}", object.last_modified.to_rfc2822());
    Ok(())
}

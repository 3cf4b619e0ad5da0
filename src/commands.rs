use crate::cli::{Cli, Command, ListArgs, LoginArgs, RemoveArgs, UploadArgs, UrlArgs};
use crate::context::Context;
use crate::error::{ErrorKind, Result};
use crate::render;
use exn::{OptionExt, ResultExt};
use keepr_api::{Credentials, IdentityProvider, Session, StaticIdentity};
use keepr_library::{Deletion, File, SortKey, Upload, View, ViewMode};
use std::path::Path;

pub async fn run(cli: Cli) -> Result<()> {
    let ctx = Context::load(cli.config.as_deref())?;
    match cli.command {
        Command::Login(args) => login(&ctx, args).await,
        Command::Logout => logout(&ctx).await,
        Command::Whoami => whoami(&ctx).await,
        Command::Ls(args) => list(&ctx, args).await,
        Command::Folders => folders(&ctx).await,
        Command::Upload(args) => upload(&ctx, args).await,
        Command::Rm(args) => remove(&ctx, args).await,
        Command::Url(args) => url(&ctx, args).await,
    }
}

async fn login(ctx: &Context, args: LoginArgs) -> Result<()> {
    let credentials = match (args.api_key, args.token) {
        (Some(key), _) => Credentials::ApiKey { key },
        (None, Some(token)) => Credentials::Token { token },
        // Ruled out by argument parsing.
        (None, None) => exn::bail!(ErrorKind::Login),
    };
    if !args.no_verify {
        let api = ctx.api(&credentials)?;
        api.list_files(Some(&args.username), Some(1), None).await.or_raise(|| ErrorKind::Login)?;
    }
    let session = Session::new(args.username, credentials);
    ctx.sessions.save(&session).await.or_raise(|| ErrorKind::Session)?;
    println!("Signed in as {}", session.username);
    Ok(())
}

async fn logout(ctx: &Context) -> Result<()> {
    match StaticIdentity::from_store(ctx.sessions.clone()).await.or_raise(|| ErrorKind::Session)? {
        Some(identity) => {
            identity.sign_out().await.or_raise(|| ErrorKind::Session)?;
            println!("Signed out");
        },
        None => println!("Not signed in"),
    }
    Ok(())
}

async fn whoami(ctx: &Context) -> Result<()> {
    let session = ctx.sessions.load().await.or_raise(|| ErrorKind::Session)?.ok_or_raise(|| ErrorKind::NotSignedIn)?;
    println!("{}", session.username);
    Ok(())
}

async fn list(ctx: &Context, args: ListArgs) -> Result<()> {
    let library = ctx.library().await?;
    let defaults = &ctx.config.view;
    let mut view = View::default()
        .with_category(args.folder)
        .with_sort(args.sort.map(SortKey::from).or(defaults.sort), args.desc || defaults.descending);
    if let Some(term) = args.search {
        view = view.with_search(term);
    }
    let mode = args.view.map(ViewMode::from).unwrap_or(defaults.mode);
    let files = library.view(&view);
    if files.is_empty() {
        println!("No files");
    } else {
        println!("{}", render::files(&files, mode));
    }
    Ok(())
}

async fn folders(ctx: &Context) -> Result<()> {
    let library = ctx.library().await?;
    println!("{}", render::folders(library.files().len(), &library.folders()));
    Ok(())
}

async fn read_upload(path: &Path) -> Result<Upload> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_raise(|| ErrorKind::Read(path.display().to_string()))?;
    let data = tokio::fs::read(path).await.or_raise(|| ErrorKind::Read(path.display().to_string()))?;
    let content_type = mime_guess::from_path(path).first_raw().map(str::to_string);
    Ok(Upload::new(name, data).with_content_type(content_type))
}

async fn upload(ctx: &Context, args: UploadArgs) -> Result<()> {
    let mut library = ctx.library().await?;
    let mut uploads = Vec::with_capacity(args.paths.len());
    let mut unreadable = 0;
    for path in &args.paths {
        match read_upload(path).await {
            Ok(upload) => uploads.push(upload),
            Err(error) => {
                eprintln!("Skipping {}: {error:?}", path.display());
                unreadable += 1;
            },
        }
    }
    let report = library.upload(uploads, render::upload_event).await.or_raise(|| ErrorKind::Library)?;
    println!("Uploaded {} file(s)", report.uploaded.len());
    for (name, error) in &report.failed {
        eprintln!("Failed to upload {name}: {error:?}");
    }
    let failed = report.failed.len() + unreadable;
    if failed > 0 {
        exn::bail!(ErrorKind::Upload(failed));
    }
    Ok(())
}

async fn remove(ctx: &Context, args: RemoveArgs) -> Result<()> {
    let mut library = ctx.library().await?;
    let yes = args.yes;
    let confirm = move |file: &File| yes || render::confirm_delete(file);
    match library.delete(&args.id, confirm).await.or_raise(|| ErrorKind::Library)? {
        Deletion::Deleted(file) => println!("Deleted {}", file.name),
        Deletion::Cancelled => println!("Cancelled"),
    }
    Ok(())
}

async fn url(ctx: &Context, args: UrlArgs) -> Result<()> {
    let library = ctx.library().await?;
    let file = library.get(&args.id).ok_or_raise(|| ErrorKind::NotFound(args.id.clone()))?;
    let url = file.url().ok_or_raise(|| ErrorKind::NoUrl(file.name.clone()))?;
    println!("{url}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_upload_guesses_content_type() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.PDF");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        let upload = read_upload(&path).await.unwrap();
        assert_eq!(upload.name, "report.PDF");
        assert_eq!(upload.data, b"%PDF-1.7");
        assert_eq!(upload.content_type.as_deref(), Some("application/pdf"));
    }

    #[tokio::test]
    async fn test_read_upload_unknown_type() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Makefile");
        std::fs::write(&path, b"all:").unwrap();
        assert_eq!(read_upload(&path).await.unwrap().content_type, None);
    }

    #[tokio::test]
    async fn test_read_upload_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read_upload(&dir.path().join("missing.txt")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Read(_)));
    }
}

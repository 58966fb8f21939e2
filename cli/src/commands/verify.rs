//! `verify`: check a manifest's signature, structure and repository
//! identity. Exits 0 only when all three pass.

use super::{Context, read_input, write_output};
use crate::cli::VerifyArgs;
use crate::error::{CliError, EXIT_SUCCESS, Result};
use crate::output::RunSummary;
use crate::registry::models::ReleaseInfo;
use crate::registry::{RegistryClient, ReleaseApi};
use camino::Utf8Path;
use log::{info, warn};
use repo_trust::manifest::naming::{MANIFEST_FILENAME, signature_filename};
use repo_trust::signing::{DetachedSignature, TrustedSigners};
use repo_trust::{VerifiedManifest, verify_manifest};
use std::io::Write;

const UPLOAD_HINT: &str = "run the upload subcommand for this release first";

/// Run the subcommand.
///
/// # Errors
///
/// Returns a [`CliError`] if any check fails or an input is missing.
pub fn run(args: &VerifyArgs, ctx: &Context<'_>, out: &mut dyn Write) -> Result<i32> {
    if args.from_release {
        let client = RegistryClient::from_config(ctx.config)?.with_retry(ctx.retry);
        fetch_from_release(args, ctx, &client)?;
    }
    let verified = verify_files(args, ctx, out)?;
    let summary = RunSummary {
        release: Some(verified.manifest.release().tag.clone()),
        artifacts: Some(verified.manifest.artifacts().len()),
        manifest: Some(args.manifest.clone()),
        ..RunSummary::success(verified.manifest.repository().full_name.clone())
    };
    ctx.finish(&summary, out)?;
    Ok(EXIT_SUCCESS)
}

/// Download the manifest and signature assets of the configured release to
/// the paths in `args`.
///
/// # Errors
///
/// Returns a [`CliError`] if the release or either asset is unavailable.
pub fn fetch_from_release(args: &VerifyArgs, ctx: &Context<'_>, api: &dyn ReleaseApi) -> Result<()> {
    let release = match ctx.config.release_tag_opt() {
        Some(tag) => api.release_by_tag(tag),
        None => api.latest_release(),
    }
    .map_err(|err| CliError::transfer("fetch release", err))?;
    info!("fetching manifest from release {}", release.tag_name);

    let signature_name = signature_filename(MANIFEST_FILENAME);
    download(api, &release, MANIFEST_FILENAME, &args.manifest)?;
    download(api, &release, &signature_name, &args.signature_path())
}

fn download(api: &dyn ReleaseApi, release: &ReleaseInfo, name: &str, dest: &Utf8Path) -> Result<()> {
    let asset = release
        .asset_named(name)
        .ok_or_else(|| CliError::MissingFile {
            what: "release asset",
            path: name.into(),
            hint: UPLOAD_HINT,
        })?;
    let bytes = api
        .download_to_vec(asset)
        .map_err(|err| CliError::transfer("download release asset", err))?;
    write_output(dest, &bytes)
}

/// Verify the local manifest and signature files named by `args`.
///
/// # Errors
///
/// Returns a [`CliError`] if any check fails or an input is missing.
pub fn verify_files(args: &VerifyArgs, ctx: &Context<'_>, out: &mut dyn Write) -> Result<VerifiedManifest> {
    let repository = ctx.config.repository()?;
    let signers = TrustedSigners::load(&ctx.config.allowed_signers_path()?)?;
    ctx.annotations.section(out, "Verifying manifest");

    let manifest = read_input(
        &args.manifest,
        "manifest",
        "run generate-manifest or pass --from-release",
    )?;
    let signature = read_input(
        &args.signature_path(),
        "signature",
        "run sign or pass --from-release",
    )?;
    let scheme = ctx.scheme()?;
    let verified = verify_manifest(
        scheme.as_ref(),
        &manifest,
        &DetachedSignature::from_bytes(signature),
        &signers,
        &repository,
    )?;

    if !verified.schema_recognized {
        warn!(
            "manifest schema version {} is newer than this tool understands; unknown fields were ignored",
            verified.manifest.schema_version().as_str()
        );
    }
    if let Some(fingerprint) = &verified.signer.fingerprint {
        info!("signed by {fingerprint}");
    }
    ctx.annotations.end_section(out);
    Ok(verified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{config_with, with_context};
    use crate::registry::MockReleaseApi;
    use crate::registry::models::AssetInfo;
    use camino::Utf8PathBuf;
    use repo_trust::VerificationError;
    use repo_trust::signing::SignatureScheme;
    use repo_trust::signing::native::NativeScheme;
    use repo_trust::test_utils::{KeyFixture, TestKey, sample_manifest};
    use std::fs;

    struct Signed {
        fixture: KeyFixture,
        manifest: Utf8PathBuf,
    }

    fn signed_for(full_name: &str) -> Signed {
        let fixture = KeyFixture::new(TestKey::Release);
        let manifest = fixture.root().join("repo-trust-manifest.json");
        let json = sample_manifest(full_name).to_canonical_json().expect("json");
        fs::write(&manifest, &json).expect("write manifest");
        let signature = NativeScheme::default()
            .sign(json.as_bytes(), &fixture.key_ref())
            .expect("sign");
        fs::write(format!("{manifest}.sig"), signature.as_bytes()).expect("write signature");
        Signed { fixture, manifest }
    }

    fn args_for(manifest: &Utf8Path) -> VerifyArgs {
        VerifyArgs {
            manifest: manifest.to_owned(),
            signature: None,
            from_release: false,
        }
    }

    fn verify_as(repository: &str, signed: &Signed) -> Result<VerifiedManifest> {
        let config = config_with(&[
            ("GITHUB_REPOSITORY", repository),
            (
                "REPO_TRUST_ALLOWED_SIGNERS",
                signed.fixture.allowed_signers_path().as_str(),
            ),
        ]);
        let mut out = Vec::new();
        with_context(&config, |ctx| verify_files(&args_for(&signed.manifest), ctx, &mut out))
    }

    #[test]
    fn accepts_a_signed_manifest_for_this_repository() {
        let signed = signed_for("octo/widgets");
        let verified = verify_as("octo/widgets", &signed).expect("verified");
        assert_eq!(verified.manifest.release().tag, "v1.2.0");
    }

    #[test]
    fn rejects_a_manifest_replayed_into_another_repository() {
        let signed = signed_for("octo/widgets");
        let err = verify_as("squatter/widgets", &signed).expect_err("replay");
        assert!(matches!(
            err,
            CliError::Verification(VerificationError::IdentityMismatch { .. })
        ));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn rejects_a_modified_manifest() {
        let signed = signed_for("octo/widgets");
        let mut bytes = fs::read(&signed.manifest).expect("read");
        bytes.push(b' ');
        fs::write(&signed.manifest, bytes).expect("tamper");
        let err = verify_as("octo/widgets", &signed).expect_err("tampered");
        assert!(matches!(err, CliError::Verification(VerificationError::BadSignature)));
    }

    #[test]
    fn a_missing_signature_is_reported_with_a_hint() {
        let signed = signed_for("octo/widgets");
        fs::remove_file(format!("{}.sig", signed.manifest)).expect("remove");
        let err = verify_as("octo/widgets", &signed).expect_err("no signature");
        assert!(matches!(err, CliError::MissingFile { what: "signature", .. }));
    }

    #[test]
    fn downloads_both_assets_from_the_release() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let manifest = Utf8PathBuf::from_path_buf(dir.path().join("m.json")).expect("utf8");
        let asset = |id, name: &str| AssetInfo {
            id,
            name: name.to_owned(),
            size: 1,
            browser_download_url: String::new(),
            download_count: 0,
        };
        let release = ReleaseInfo {
            id: 1,
            tag_name: "v1".to_owned(),
            name: None,
            published_at: None,
            html_url: None,
            upload_url: String::new(),
            assets: vec![
                asset(10, "repo-trust-manifest.json"),
                asset(11, "repo-trust-manifest.json.sig"),
            ],
        };
        let mut api = MockReleaseApi::new();
        api.expect_latest_release().return_once(move || Ok(release));
        api.expect_download_to_vec()
            .returning(|asset| Ok(format!("asset {}", asset.id).into_bytes()));
        let config = config_with(&[]);

        with_context(&config, |ctx| fetch_from_release(&args_for(&manifest), ctx, &api))
            .expect("fetched");

        assert_eq!(fs::read_to_string(&manifest).expect("manifest"), "asset 10");
        assert_eq!(
            fs::read_to_string(format!("{manifest}.sig")).expect("signature"),
            "asset 11"
        );
    }

    #[test]
    fn a_release_without_a_manifest_is_reported() {
        let mut api = MockReleaseApi::new();
        api.expect_release_by_tag().returning(|tag| {
            Ok(ReleaseInfo {
                id: 1,
                tag_name: tag.to_owned(),
                name: None,
                published_at: None,
                html_url: None,
                upload_url: String::new(),
                assets: Vec::new(),
            })
        });
        let config = config_with(&[("GITHUB_REF_NAME", "v2")]);

        let err = with_context(&config, |ctx| {
            fetch_from_release(&args_for(Utf8Path::new("unused.json")), ctx, &api)
        })
        .expect_err("no asset");

        assert!(matches!(err, CliError::MissingFile { what: "release asset", .. }));
    }
}

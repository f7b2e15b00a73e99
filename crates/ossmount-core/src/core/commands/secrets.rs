use anyhow::Result;
use ossmount_domain::CredentialRecord;
use serde_json::json;

use crate::{CommandContext, ExecutionOutcome};

#[derive(Clone, Debug)]
pub struct SecretAddRequest {
    pub bucket: String,
    pub access_key_id: String,
    pub access_key_secret: String,
}

/// Appends one bucket's credentials to the store.
///
/// # Errors
/// Returns a validation error for bad or duplicate input, or an I/O error
/// naming the store file.
pub fn secret_add(ctx: &CommandContext, request: &SecretAddRequest) -> Result<ExecutionOutcome> {
    secret_add_all(ctx, std::slice::from_ref(request))
}

/// Appends a batch of credentials in one write. Nothing is stored unless
/// every entry is valid.
///
/// # Errors
/// Returns a validation error for bad or duplicate input, or an I/O error
/// naming the store file.
pub fn secret_add_all(
    ctx: &CommandContext,
    requests: &[SecretAddRequest],
) -> Result<ExecutionOutcome> {
    let store = ctx.credential_store();
    let records = to_records(requests)?;
    store.append_all(&records)?;
    let count = store.list()?.len();
    let buckets: Vec<&str> = records.iter().map(|r| r.bucket.as_str()).collect();
    Ok(ExecutionOutcome::success(
        format!("stored credentials for bucket {}", buckets.join(", ")),
        json!({
            "bucket": buckets.last(),
            "buckets": buckets,
            "index": count,
            "records": count,
            "store": store.path().display().to_string(),
        }),
    ))
}

/// Validates entries the way [`secret_add_all`] would, without writing.
///
/// # Errors
/// Returns the validation error the batch would fail with.
pub fn secret_check(ctx: &CommandContext, requests: &[SecretAddRequest]) -> Result<()> {
    let records = to_records(requests)?;
    ctx.credential_store().check_new(&records)
}

/// Whether any credentials are stored yet.
#[must_use]
pub fn credentials_present(ctx: &CommandContext) -> bool {
    ctx.credential_store().exists_nonempty()
}

fn to_records(requests: &[SecretAddRequest]) -> Result<Vec<CredentialRecord>> {
    requests
        .iter()
        .map(|request| {
            CredentialRecord::new(
                &request.bucket,
                &request.access_key_id,
                &request.access_key_secret,
            )
            .map_err(Into::into)
        })
        .collect()
}

/// Lists stored buckets with the 1-based index used by `mount add`.
///
/// # Errors
/// Returns an error if the store cannot be read or holds a malformed line.
pub fn secret_list(ctx: &CommandContext) -> Result<ExecutionOutcome> {
    let store = ctx.credential_store();
    let records = store.list()?;
    let secrets: Vec<_> = records
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            json!({
                "index": idx + 1,
                "bucket": record.bucket,
                "access_key_id": mask(&record.access_key_id),
            })
        })
        .collect();
    let mut details = json!({
        "store": store.path().display().to_string(),
        "secrets": secrets,
    });
    if records.is_empty() {
        details["hint"] = json!("Add credentials with `ossmount secret add`.");
        return Ok(ExecutionOutcome::success("no credentials stored", details));
    }
    Ok(ExecutionOutcome::success(
        format!("{} bucket(s) stored", records.len()),
        details,
    ))
}

fn mask(key_id: &str) -> String {
    let visible: String = key_id.chars().take(4).collect();
    if visible.len() == key_id.len() {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use ossmount_domain::ValidationError;

    use super::*;
    use crate::testing::TestHost;

    fn add(host: &TestHost, bucket: &str) -> Result<ExecutionOutcome> {
        secret_add(
            &host.context(),
            &SecretAddRequest {
                bucket: bucket.to_string(),
                access_key_id: "AK123456".to_string(),
                access_key_secret: "SK456".to_string(),
            },
        )
    }

    #[test]
    fn add_then_list_shows_index_without_secret() {
        let host = TestHost::new();
        let outcome = add(&host, "media").expect("add");
        assert_eq!(outcome.details["index"], 1);

        let listed = secret_list(&host.context()).expect("list");
        let secrets = listed.details["secrets"].as_array().expect("secrets");
        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets[0]["bucket"], "media");
        assert_eq!(secrets[0]["access_key_id"], "AK12****");
        assert!(!listed.details.to_string().contains("SK456"));
    }

    #[test]
    fn duplicate_bucket_is_rejected_without_writing() {
        let host = TestHost::new();
        add(&host, "media").expect("first");
        let before = fs::read_to_string(host.layout().passwd_file()).expect("read");

        let err = add(&host, "media").expect_err("duplicate");
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::DuplicateBucket { .. })
        ));
        assert_eq!(
            fs::read_to_string(host.layout().passwd_file()).expect("read"),
            before
        );
    }

    #[test]
    fn empty_store_lists_hint() {
        let host = TestHost::new();
        let outcome = secret_list(&host.context()).expect("list");
        assert_eq!(outcome.message, "no credentials stored");
        assert!(outcome.details["hint"].is_string());
    }

    #[test]
    fn presence_follows_store_contents() {
        let host = TestHost::new();
        assert!(!credentials_present(&host.context()));
        fs::create_dir_all(host.layout().passwd_file().parent().expect("parent")).expect("mkdir");
        fs::write(host.layout().passwd_file(), "").expect("empty store");
        assert!(!credentials_present(&host.context()));

        add(&host, "media").expect("add");
        assert!(credentials_present(&host.context()));
    }

    fn entry(bucket: &str) -> SecretAddRequest {
        SecretAddRequest {
            bucket: bucket.to_string(),
            access_key_id: format!("AK-{bucket}"),
            access_key_secret: "SK".to_string(),
        }
    }

    #[test]
    fn batch_is_checked_then_written_once() {
        let host = TestHost::new();
        let batch = [entry("media"), entry("backup")];
        secret_check(&host.context(), &batch).expect("valid batch");
        assert!(!host.layout().passwd_file().exists());

        let outcome = secret_add_all(&host.context(), &batch).expect("add all");
        assert_eq!(outcome.details["records"], 2);
        assert_eq!(outcome.details["buckets"], json!(["media", "backup"]));
        assert_eq!(
            fs::read_to_string(host.layout().passwd_file()).expect("read"),
            "media:AK-media:SK\nbackup:AK-backup:SK\n"
        );
    }

    #[test]
    fn batch_with_repeated_bucket_writes_nothing() {
        let host = TestHost::new();
        let batch = [entry("media"), entry("media")];
        assert!(secret_check(&host.context(), &batch).is_err());
        let err = secret_add_all(&host.context(), &batch).expect_err("duplicate");
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::DuplicateBucket { .. })
        ));
        assert!(!host.layout().passwd_file().exists());
    }
}

// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant, credential, and attribution-settings lookups.

use std::str::FromStr;

use rusqlite::params;
use waflow_core::types::{CredentialBundle, TenantStatus};
use waflow_core::WaflowError;

use crate::database::Database;
use crate::models::{AttributionSettings, Tenant};

fn parse_status(raw: String) -> Result<TenantStatus, rusqlite::Error> {
    TenantStatus::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Insert or replace a tenant row.
pub async fn upsert_tenant(db: &Database, tenant: &Tenant) -> Result<(), WaflowError> {
    let tenant = tenant.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tenants (id, name, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                     name = excluded.name,
                     status = excluded.status,
                     updated_at = excluded.updated_at",
                params![
                    tenant.id,
                    tenant.name,
                    tenant.status.to_string(),
                    tenant.created_at,
                    tenant.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a tenant by id.
pub async fn get_tenant(db: &Database, id: &str) -> Result<Option<Tenant>, WaflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, name, status, created_at, updated_at FROM tenants WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Tenant {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        status: parse_status(row.get(2)?)?,
                        created_at: row.get(3)?,
                        updated_at: row.get(4)?,
                    })
                },
            );
            match result {
                Ok(tenant) => Ok(Some(tenant)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List ids of all active tenants.
pub async fn list_active_tenant_ids(db: &Database) -> Result<Vec<String>, WaflowError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM tenants WHERE status = 'active'")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut ids = Vec::new();
            for row in rows {
                ids.push(row?);
            }
            Ok(ids)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert or replace the credential bundle for a tenant.
pub async fn upsert_credentials(
    db: &Database,
    tenant_id: &str,
    bundle: &CredentialBundle,
) -> Result<(), WaflowError> {
    let tenant_id = tenant_id.to_string();
    let bundle = bundle.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tenant_credentials
                     (tenant_id, access_token, verify_token, app_secret, phone_number_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(tenant_id) DO UPDATE SET
                     access_token = excluded.access_token,
                     verify_token = excluded.verify_token,
                     app_secret = excluded.app_secret,
                     phone_number_id = excluded.phone_number_id,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![
                    tenant_id,
                    bundle.access_token,
                    bundle.verify_token,
                    bundle.app_secret,
                    bundle.phone_number_id,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the credential bundle for a tenant, if configured.
pub async fn get_credentials(
    db: &Database,
    tenant_id: &str,
) -> Result<Option<CredentialBundle>, WaflowError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT access_token, verify_token, app_secret, phone_number_id
                 FROM tenant_credentials WHERE tenant_id = ?1",
                params![tenant_id],
                |row| {
                    Ok(CredentialBundle {
                        access_token: row.get(0)?,
                        verify_token: row.get(1)?,
                        app_secret: row.get(2)?,
                        phone_number_id: row.get(3)?,
                    })
                },
            );
            match result {
                Ok(bundle) => Ok(Some(bundle)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert or replace a tenant's attribution settings.
pub async fn upsert_attribution(
    db: &Database,
    settings: &AttributionSettings,
) -> Result<(), WaflowError> {
    let settings = settings.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tenant_attribution (tenant_id, dataset_id, api_token)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(tenant_id) DO UPDATE SET
                     dataset_id = excluded.dataset_id,
                     api_token = excluded.api_token,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![settings.tenant_id, settings.dataset_id, settings.api_token],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a tenant's attribution settings, if configured.
pub async fn get_attribution(
    db: &Database,
    tenant_id: &str,
) -> Result<Option<AttributionSettings>, WaflowError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT tenant_id, dataset_id, api_token FROM tenant_attribution
                 WHERE tenant_id = ?1",
                params![tenant_id],
                |row| {
                    Ok(AttributionSettings {
                        tenant_id: row.get(0)?,
                        dataset_id: row.get(1)?,
                        api_token: row.get(2)?,
                    })
                },
            );
            match result {
                Ok(settings) => Ok(Some(settings)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tenant(id: &str, status: TenantStatus) -> Tenant {
        Tenant {
            id: id.to_string(),
            name: format!("tenant {id}"),
            status,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_and_get_tenant() {
        let db = Database::open_in_memory().await.unwrap();
        upsert_tenant(&db, &make_tenant("t1", TenantStatus::Active))
            .await
            .unwrap();

        let tenant = get_tenant(&db, "t1").await.unwrap().unwrap();
        assert_eq!(tenant.id, "t1");
        assert_eq!(tenant.status, TenantStatus::Active);

        assert!(get_tenant(&db, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_active_skips_suspended() {
        let db = Database::open_in_memory().await.unwrap();
        upsert_tenant(&db, &make_tenant("t1", TenantStatus::Active))
            .await
            .unwrap();
        upsert_tenant(&db, &make_tenant("t2", TenantStatus::Suspended))
            .await
            .unwrap();

        let ids = list_active_tenant_ids(&db).await.unwrap();
        assert_eq!(ids, vec!["t1".to_string()]);
    }

    #[tokio::test]
    async fn credentials_round_trip() {
        let db = Database::open_in_memory().await.unwrap();
        upsert_tenant(&db, &make_tenant("t1", TenantStatus::Active))
            .await
            .unwrap();

        assert!(get_credentials(&db, "t1").await.unwrap().is_none());

        let bundle = CredentialBundle {
            access_token: "tok".into(),
            verify_token: "verify".into(),
            app_secret: "secret".into(),
            phone_number_id: "1555000".into(),
        };
        upsert_credentials(&db, "t1", &bundle).await.unwrap();

        let loaded = get_credentials(&db, "t1").await.unwrap().unwrap();
        assert_eq!(loaded.app_secret, "secret");
        assert_eq!(loaded.phone_number_id, "1555000");
    }

    #[tokio::test]
    async fn attribution_round_trip() {
        let db = Database::open_in_memory().await.unwrap();
        upsert_tenant(&db, &make_tenant("t1", TenantStatus::Active))
            .await
            .unwrap();

        assert!(get_attribution(&db, "t1").await.unwrap().is_none());

        let settings = AttributionSettings {
            tenant_id: "t1".into(),
            dataset_id: "ds-9".into(),
            api_token: "attr-token".into(),
        };
        upsert_attribution(&db, &settings).await.unwrap();

        let loaded = get_attribution(&db, "t1").await.unwrap().unwrap();
        assert_eq!(loaded.dataset_id, "ds-9");
    }
}

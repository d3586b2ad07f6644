//! Finding repository: append, fetch, and list across the four kinds.

use libsql::Value;
use verdant_core::entities::{
    AudioAnalysis, ConservationAction, EcosystemAssessment, Finding, MediaRef, SpeciesDiscovery,
    StoredFinding,
};
use verdant_core::enums::FindingKind;
use verdant_core::ids::FindingId;
use verdant_core::score::Score;

use crate::error::DatabaseError;
use crate::filter::FindingFilter;
use crate::helpers::{
    format_timestamp, from_json, get_location, get_opt_string, location_values, opt_text,
    parse_datetime, parse_enum, parse_optional_datetime, to_json,
};
use crate::retry::with_retry;
use crate::store::{FindingStore, finish};

/// Identifiers assigned by [`FindingStore::save_bundle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedBundle {
    pub primary: FindingId,
    pub actions: Vec<FindingId>,
}

impl FindingStore {
    /// Append one finding.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::ConstraintViolation` if the finding breaks an
    /// invariant or references an unknown subject.
    pub async fn save(&self, finding: &Finding) -> Result<FindingId, DatabaseError> {
        Ok(self.save_bundle(finding, &[]).await?.primary)
    }

    /// Append a finding and its derived actions in one transaction.
    ///
    /// Either every row is committed or none is.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::ConstraintViolation` if any row breaks an
    /// invariant or references an unknown subject.
    pub async fn save_bundle(
        &self,
        primary: &Finding,
        actions: &[ConservationAction],
    ) -> Result<SavedBundle, DatabaseError> {
        let actions: Vec<Finding> = actions.iter().cloned().map(Finding::from).collect();
        primary.validate()?;
        for action in &actions {
            action.validate()?;
        }

        let saved = with_retry(self.retry(), "save_bundle", || {
            self.save_bundle_once(primary, &actions)
        })
        .await?;

        tracing::debug!(
            id = %saved.primary,
            kind = %primary.kind(),
            actions = saved.actions.len(),
            "saved finding"
        );
        Ok(saved)
    }

    async fn save_bundle_once(
        &self,
        primary: &Finding,
        actions: &[Finding],
    ) -> Result<SavedBundle, DatabaseError> {
        let db = self.db().write().await;
        let tx = db.conn().transaction().await?;
        let result = insert_bundle(&tx, primary, actions).await;
        finish(tx, result).await
    }

    /// Fetch one finding by id. Returns `None` for unknown ids or ids whose
    /// kind prefix does not match the stored row.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or the row cannot be decoded.
    pub async fn get(&self, id: FindingId) -> Result<Option<Finding>, DatabaseError> {
        with_retry(self.retry(), "get", || async move {
            let db = self.db().read().await;
            let conn = db.conn();

            let mut rows = conn
                .query("SELECT kind FROM finding_log WHERE seq = ?1", [id.seq()])
                .await?;
            let Some(row) = rows.next().await? else {
                return Ok(None);
            };
            let kind: FindingKind = parse_enum(&row.get::<String>(0)?)?;
            if kind != id.kind() {
                return Ok(None);
            }
            load_finding(conn, kind, id.seq()).await
        })
        .await
    }

    /// List findings newest-first by `created_at`, ties broken by insertion
    /// order (newer first). Without `kind`, all four kinds are merged.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or a row cannot be decoded.
    pub async fn query(
        &self,
        kind: Option<FindingKind>,
        filter: &FindingFilter,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<StoredFinding>, DatabaseError> {
        with_retry(self.retry(), "query", || async move {
            let db = self.db().read().await;
            query_findings(db.conn(), kind, filter, limit, offset).await
        })
        .await
    }
}

pub(crate) async fn insert_bundle(
    conn: &libsql::Connection,
    primary: &Finding,
    actions: &[Finding],
) -> Result<SavedBundle, DatabaseError> {
    let primary_id = insert_finding(conn, primary).await?;
    let mut action_ids = Vec::with_capacity(actions.len());
    for action in actions {
        action_ids.push(insert_finding(conn, action).await?);
    }
    Ok(SavedBundle {
        primary: primary_id,
        actions: action_ids,
    })
}

/// New findings may only reference subjects in the current catalogue.
async fn ensure_subject(conn: &libsql::Connection, subject_ref: &str) -> Result<(), DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT 1 FROM subjects WHERE id = ?1 AND active = 1",
            [subject_ref],
        )
        .await?;
    if rows.next().await?.is_none() {
        return Err(DatabaseError::ConstraintViolation(format!(
            "unknown subject '{subject_ref}'"
        )));
    }
    Ok(())
}

/// Insert one finding into the log and its kind table. Must run inside a
/// transaction.
pub(crate) async fn insert_finding(
    conn: &libsql::Connection,
    finding: &Finding,
) -> Result<FindingId, DatabaseError> {
    for subject_ref in finding.subject_refs() {
        ensure_subject(conn, subject_ref).await?;
    }
    insert_row(conn, finding).await
}

/// Insert without the active-subject check. Only for rows whose subject
/// reference is inherited from a row that was already accepted; the foreign
/// key still applies.
pub(crate) async fn insert_row(
    conn: &libsql::Connection,
    finding: &Finding,
) -> Result<FindingId, DatabaseError> {
    let kind = finding.kind();
    let created_at = format_timestamp(&finding.created_at());
    conn.execute(
        "INSERT INTO finding_log (kind, created_at) VALUES (?1, ?2)",
        libsql::params![kind.as_str(), created_at.as_str()],
    )
    .await?;
    let seq = conn.last_insert_rowid();

    match finding {
        Finding::SpeciesDiscovery(d) => {
            let [lat, lng, name] = location_values(d.location.as_ref());
            conn.execute(
                "INSERT INTO species_discoveries (seq, subject_ref, confidence, media_ref,
                    latitude, longitude, location_name, conservation_status_snapshot,
                    threats_snapshot, recommendations, notes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                libsql::params_from_iter(vec![
                    Value::Integer(seq),
                    Value::Text(d.subject_ref.clone()),
                    Value::Real(d.confidence.value()),
                    Value::Text(d.media_ref.to_string()),
                    lat,
                    lng,
                    name,
                    Value::Text(d.conservation_status_snapshot.as_str().to_string()),
                    Value::Text(to_json(&d.threats_snapshot)?),
                    Value::Text(to_json(&d.recommendations)?),
                    opt_text(d.notes.as_deref()),
                    Value::Text(created_at),
                ]),
            )
            .await?;
        }
        Finding::AudioAnalysis(a) => {
            let [lat, lng, name] = location_values(a.location.as_ref());
            conn.execute(
                "INSERT INTO audio_analyses (seq, media_ref, duration_seconds, detected_sounds,
                    biodiversity_score, environmental_health, detected_subjects, recommendations,
                    latitude, longitude, location_name, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                libsql::params_from_iter(vec![
                    Value::Integer(seq),
                    Value::Text(a.media_ref.to_string()),
                    Value::Real(a.duration_seconds),
                    Value::Text(to_json(&a.detected_sounds)?),
                    Value::Real(a.biodiversity_score.value()),
                    Value::Text(a.environmental_health.as_str().to_string()),
                    Value::Text(to_json(&a.detected_subjects)?),
                    Value::Text(to_json(&a.recommendations)?),
                    lat,
                    lng,
                    name,
                    Value::Text(created_at),
                ]),
            )
            .await?;
        }
        Finding::EcosystemAssessment(e) => {
            let [lat, lng, name] = location_values(e.location.as_ref());
            conn.execute(
                "INSERT INTO ecosystem_assessments (seq, image_ref, audio_ref, overall_health,
                    biodiversity_index, indicators, threats, strengths, recommendations,
                    latitude, longitude, location_name, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                libsql::params_from_iter(vec![
                    Value::Integer(seq),
                    opt_text(e.image_ref.as_ref().map(MediaRef::as_str)),
                    opt_text(e.audio_ref.as_ref().map(MediaRef::as_str)),
                    Value::Real(e.overall_health.value()),
                    Value::Real(e.biodiversity_index.value()),
                    Value::Text(to_json(&e.indicators)?),
                    Value::Text(to_json(&e.threats)?),
                    Value::Text(to_json(&e.strengths)?),
                    Value::Text(to_json(&e.recommendations)?),
                    lat,
                    lng,
                    name,
                    Value::Text(created_at),
                ]),
            )
            .await?;
        }
        Finding::ConservationAction(c) => {
            let [lat, lng, name] = location_values(c.location.as_ref());
            conn.execute(
                "INSERT INTO conservation_actions (seq, action_type, description,
                    related_subject_ref, impact_score, completed, completed_at,
                    latitude, longitude, location_name, supersedes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                libsql::params_from_iter(vec![
                    Value::Integer(seq),
                    Value::Text(c.action_type.clone()),
                    Value::Text(c.description.clone()),
                    opt_text(c.related_subject_ref.as_deref()),
                    Value::Integer(c.impact_score),
                    Value::Integer(i64::from(c.completed)),
                    c.completed_at
                        .as_ref()
                        .map_or(Value::Null, |t| Value::Text(format_timestamp(t))),
                    lat,
                    lng,
                    name,
                    c.supersedes
                        .map_or(Value::Null, |id| Value::Integer(id.seq())),
                    Value::Text(created_at),
                ]),
            )
            .await?;
        }
    }

    Ok(FindingId::new(kind, seq))
}

fn row_to_discovery(row: &libsql::Row) -> Result<SpeciesDiscovery, DatabaseError> {
    Ok(SpeciesDiscovery {
        subject_ref: row.get::<String>(0)?,
        confidence: Score::new(row.get::<f64>(1)?)?,
        media_ref: MediaRef::new(row.get::<String>(2)?),
        location: get_location(row, 3)?,
        conservation_status_snapshot: parse_enum(&row.get::<String>(6)?)?,
        threats_snapshot: from_json(&row.get::<String>(7)?)?,
        recommendations: from_json(&row.get::<String>(8)?)?,
        notes: get_opt_string(row, 9)?,
        created_at: parse_datetime(&row.get::<String>(10)?)?,
    })
}

fn row_to_audio(row: &libsql::Row) -> Result<AudioAnalysis, DatabaseError> {
    Ok(AudioAnalysis {
        media_ref: MediaRef::new(row.get::<String>(0)?),
        duration_seconds: row.get::<f64>(1)?,
        detected_sounds: from_json(&row.get::<String>(2)?)?,
        biodiversity_score: Score::new(row.get::<f64>(3)?)?,
        environmental_health: parse_enum(&row.get::<String>(4)?)?,
        detected_subjects: from_json(&row.get::<String>(5)?)?,
        recommendations: from_json(&row.get::<String>(6)?)?,
        location: get_location(row, 7)?,
        created_at: parse_datetime(&row.get::<String>(10)?)?,
    })
}

fn row_to_ecosystem(row: &libsql::Row) -> Result<EcosystemAssessment, DatabaseError> {
    Ok(EcosystemAssessment {
        image_ref: get_opt_string(row, 0)?.map(MediaRef::new),
        audio_ref: get_opt_string(row, 1)?.map(MediaRef::new),
        overall_health: Score::new(row.get::<f64>(2)?)?,
        biodiversity_index: Score::new(row.get::<f64>(3)?)?,
        indicators: from_json(&row.get::<String>(4)?)?,
        threats: from_json(&row.get::<String>(5)?)?,
        strengths: from_json(&row.get::<String>(6)?)?,
        recommendations: from_json(&row.get::<String>(7)?)?,
        location: get_location(row, 8)?,
        created_at: parse_datetime(&row.get::<String>(11)?)?,
    })
}

fn row_to_action(row: &libsql::Row) -> Result<ConservationAction, DatabaseError> {
    Ok(ConservationAction {
        action_type: row.get::<String>(0)?,
        description: row.get::<String>(1)?,
        related_subject_ref: get_opt_string(row, 2)?,
        impact_score: row.get::<i64>(3)?,
        completed: row.get::<i64>(4)? != 0,
        completed_at: parse_optional_datetime(get_opt_string(row, 5)?.as_deref())?,
        location: get_location(row, 6)?,
        supersedes: row
            .get::<Option<i64>>(9)?
            .map(|seq| FindingId::new(FindingKind::ConservationAction, seq)),
        created_at: parse_datetime(&row.get::<String>(10)?)?,
    })
}

/// Load the kind-table row for `seq`.
pub(crate) async fn load_finding(
    conn: &libsql::Connection,
    kind: FindingKind,
    seq: i64,
) -> Result<Option<Finding>, DatabaseError> {
    let sql = match kind {
        FindingKind::SpeciesDiscovery => {
            "SELECT subject_ref, confidence, media_ref, latitude, longitude, location_name,
                    conservation_status_snapshot, threats_snapshot, recommendations, notes,
                    created_at
             FROM species_discoveries WHERE seq = ?1"
        }
        FindingKind::AudioAnalysis => {
            "SELECT media_ref, duration_seconds, detected_sounds, biodiversity_score,
                    environmental_health, detected_subjects, recommendations,
                    latitude, longitude, location_name, created_at
             FROM audio_analyses WHERE seq = ?1"
        }
        FindingKind::EcosystemAssessment => {
            "SELECT image_ref, audio_ref, overall_health, biodiversity_index, indicators,
                    threats, strengths, recommendations, latitude, longitude, location_name,
                    created_at
             FROM ecosystem_assessments WHERE seq = ?1"
        }
        FindingKind::ConservationAction => {
            "SELECT action_type, description, related_subject_ref, impact_score, completed,
                    completed_at, latitude, longitude, location_name, supersedes, created_at
             FROM conservation_actions WHERE seq = ?1"
        }
    };

    let mut rows = conn.query(sql, [seq]).await?;
    let Some(row) = rows.next().await? else {
        return Ok(None);
    };
    let finding = match kind {
        FindingKind::SpeciesDiscovery => row_to_discovery(&row)?.into(),
        FindingKind::AudioAnalysis => row_to_audio(&row)?.into(),
        FindingKind::EcosystemAssessment => row_to_ecosystem(&row)?.into(),
        FindingKind::ConservationAction => row_to_action(&row)?.into(),
    };
    Ok(Some(finding))
}

async fn query_findings(
    conn: &libsql::Connection,
    kind: Option<FindingKind>,
    filter: &FindingFilter,
    limit: u32,
    offset: u32,
) -> Result<Vec<StoredFinding>, DatabaseError> {
    let params = vec![
        kind.map_or(Value::Null, |k| Value::Text(k.as_str().to_string())),
        filter
            .since
            .as_ref()
            .map_or(Value::Null, |t| Value::Text(format_timestamp(t))),
        Value::Integer(i64::from(filter.include_superseded)),
        opt_text(filter.subject_ref.as_deref()),
        Value::Integer(i64::from(limit)),
        Value::Integer(i64::from(offset)),
    ];

    let mut rows = conn
        .query(
            "SELECT l.seq, l.kind FROM finding_log l
             WHERE (?1 IS NULL OR l.kind = ?1)
               AND (?2 IS NULL OR l.created_at >= ?2)
               AND (?3 = 1 OR NOT EXISTS (
                    SELECT 1 FROM conservation_actions s WHERE s.supersedes = l.seq))
               AND (?4 IS NULL
                    OR EXISTS (SELECT 1 FROM species_discoveries d
                               WHERE d.seq = l.seq AND d.subject_ref = ?4)
                    OR EXISTS (SELECT 1 FROM conservation_actions c
                               WHERE c.seq = l.seq AND c.related_subject_ref = ?4)
                    OR EXISTS (SELECT 1 FROM audio_analyses a, json_each(a.detected_subjects) j
                               WHERE a.seq = l.seq AND j.value = ?4))
             ORDER BY l.created_at DESC, l.seq DESC
             LIMIT ?5 OFFSET ?6",
            libsql::params_from_iter(params),
        )
        .await?;

    let mut keys = Vec::new();
    while let Some(row) = rows.next().await? {
        let seq = row.get::<i64>(0)?;
        let kind: FindingKind = parse_enum(&row.get::<String>(1)?)?;
        keys.push((seq, kind));
    }

    let mut findings = Vec::with_capacity(keys.len());
    for (seq, kind) in keys {
        let finding = load_finding(conn, kind, seq).await?.ok_or_else(|| {
            DatabaseError::Query(format!("finding_log row {seq} has no {kind} row"))
        })?;
        findings.push(StoredFinding {
            id: FindingId::new(kind, seq),
            finding,
        });
    }
    Ok(findings)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use verdant_core::location::Location;

    use super::*;
    use crate::test_support::{action, audio, discovery, seeded_store};

    #[tokio::test]
    async fn save_then_query_returns_it_first() {
        let (store, catalogue) = seeded_store().await;
        store.save(&discovery(&catalogue, "neem", 0.7)).await.unwrap();
        let latest = discovery(&catalogue, "bengal-tiger", 0.93);
        let id = store.save(&latest).await.unwrap();

        let page = store
            .query(
                Some(FindingKind::SpeciesDiscovery),
                &FindingFilter::default(),
                1,
                0,
            )
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, id);
        assert_eq!(page[0].finding, latest);
    }

    #[tokio::test]
    async fn get_roundtrips_every_kind() {
        let (store, catalogue) = seeded_store().await;
        let findings = vec![
            discovery(&catalogue, "house-sparrow", 0.81),
            audio(0.45, &["house-sparrow", "common-myna"]),
            EcosystemAssessment::new(
                None,
                Some(MediaRef::new("pond.wav")),
                Score::new(0.5).unwrap(),
                Score::new(0.4).unwrap(),
                [("bird_activity".to_string(), Score::new(0.5).unwrap())].into(),
                vec!["Noise".into()],
                Vec::new(),
                None,
            )
            .unwrap()
            .into(),
            action(Some("house-sparrow"), "Install nest boxes").into(),
        ];
        for finding in findings {
            let id = store.save(&finding).await.unwrap();
            assert_eq!(id.kind(), finding.kind());
            assert_eq!(store.get(id).await.unwrap(), Some(finding));
        }
    }

    #[tokio::test]
    async fn ids_are_monotonic_across_kinds() {
        let (store, catalogue) = seeded_store().await;
        let a = store.save(&audio(0.3, &[])).await.unwrap();
        let b = store.save(&discovery(&catalogue, "neem", 0.6)).await.unwrap();
        assert!(b.seq() > a.seq());
        assert_eq!(a.to_string(), format!("aud-{}", a.seq()));
    }

    #[tokio::test]
    async fn get_with_wrong_prefix_is_none() {
        let (store, _) = seeded_store().await;
        let id = store.save(&audio(0.3, &[])).await.unwrap();
        let wrong = FindingId::new(FindingKind::EcosystemAssessment, id.seq());
        assert_eq!(store.get(wrong).await.unwrap(), None);
    }

    #[tokio::test]
    async fn dangling_subject_is_rejected() {
        let (store, catalogue) = seeded_store().await;
        let Finding::SpeciesDiscovery(mut d) = discovery(&catalogue, "neem", 0.6) else {
            unreachable!()
        };
        d.subject_ref = "dodo".into();
        let err = store.save(&d.into()).await.unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));

        let err = store.save(&audio(0.5, &["yeti"])).await.unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));

        let stats = store.aggregate_stats().await.unwrap();
        assert_eq!(stats.total, 0);
    }

    #[tokio::test]
    async fn field_assembled_invalid_finding_is_rejected() {
        let (store, _) = seeded_store().await;
        let Finding::AudioAnalysis(mut a) = audio(0.5, &[]) else {
            unreachable!()
        };
        a.duration_seconds = -3.0;
        let err = store.save(&a.into()).await.unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn bundle_is_all_or_nothing() {
        let (store, catalogue) = seeded_store().await;
        let primary = discovery(&catalogue, "asian-elephant", 0.9);
        let actions = vec![
            action(Some("asian-elephant"), "Keep corridors open"),
            action(Some("mammoth"), "Thaw permafrost carefully"),
        ];
        let err = store.save_bundle(&primary, &actions).await.unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));

        let all = store
            .query(None, &FindingFilter::default(), 100, 0)
            .await
            .unwrap();
        assert!(all.is_empty(), "no row of a failed bundle may be visible");

        let saved = store
            .save_bundle(&primary, &actions[..1])
            .await
            .unwrap();
        assert_eq!(saved.actions.len(), 1);
        assert!(saved.actions[0].seq() > saved.primary.seq());
    }

    #[tokio::test]
    async fn query_orders_by_created_at_then_insertion() {
        let (store, catalogue) = seeded_store().await;

        let Finding::SpeciesDiscovery(mut old) = discovery(&catalogue, "neem", 0.6) else {
            unreachable!()
        };
        old.created_at = Utc::now() - Duration::days(2);
        let old_id = store.save(&old.into()).await.unwrap();

        let same_instant = Utc::now();
        let mut ids = Vec::new();
        for score in [0.2, 0.3] {
            let Finding::AudioAnalysis(mut a) = audio(score, &[]) else {
                unreachable!()
            };
            a.created_at = same_instant;
            ids.push(store.save(&a.into()).await.unwrap());
        }

        let listed: Vec<FindingId> = store
            .query(None, &FindingFilter::default(), 10, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(listed, vec![ids[1], ids[0], old_id]);

        let page: Vec<FindingId> = store
            .query(None, &FindingFilter::default(), 2, 1)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(page, vec![ids[0], old_id]);
    }

    #[tokio::test]
    async fn filter_by_subject_and_since() {
        let (store, catalogue) = seeded_store().await;
        store.save(&discovery(&catalogue, "neem", 0.6)).await.unwrap();
        let sparrow = store
            .save(&discovery(&catalogue, "house-sparrow", 0.8))
            .await
            .unwrap();
        let heard = store
            .save(&audio(0.5, &["house-sparrow"]))
            .await
            .unwrap();

        let hits: Vec<FindingId> = store
            .query(None, &FindingFilter::subject("house-sparrow"), 10, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(hits, vec![heard, sparrow]);

        let future = FindingFilter {
            since: Some(Utc::now() + Duration::hours(1)),
            ..FindingFilter::default()
        };
        assert!(store.query(None, &future, 10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn location_survives_roundtrip() {
        let (store, catalogue) = seeded_store().await;
        let id = store
            .save(&discovery(&catalogue, "peepal", 0.77))
            .await
            .unwrap();
        let finding = store.get(id).await.unwrap().unwrap();
        assert_eq!(
            finding.location(),
            Some(&Location::new(12.97, 77.59, "Cubbon Park, Bengaluru").unwrap())
        );
    }
}

//! Hotspot detection — greedy proximity clustering of active issues.
//!
//! The pass is single and order-dependent: each unclustered issue, taken in
//! input order, seeds a candidate cluster of every other unclustered issue
//! within the radius. The candidate is committed as soon as it reaches
//! `min_issues`; otherwise the seed stays available to later seeds. Feeding
//! the same issues in another order can yield different (still radius-valid)
//! clusters. For a fixed order the result is deterministic.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  geo::{self, Coordinate},
  issue::{Issue, IssueCategory},
};

/// A cluster of spatially close active issues. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
  /// `hotspot_{category}_{seed id}`; stable for a fixed input.
  pub id:            String,
  pub center_lat:    f64,
  pub center_lng:    f64,
  pub radius_meters: f64,
  pub issue_count:   usize,
  /// Category of the issue that seeded the cluster.
  pub category:      IssueCategory,
  /// Seed first, then neighbors in input order.
  pub issue_ids:     Vec<Uuid>,
  pub created_at:    DateTime<Utc>,
}

/// Parameters for [`HotspotDetector::detect`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotspotOptions {
  #[serde(alias = "radiusMeters")]
  pub radius_meters: f64,
  /// Minimum cluster size, seed included.
  #[serde(alias = "minIssues")]
  pub min_issues:    usize,
  /// Restrict clustering to one category; neighbors must then share it.
  pub category:      Option<IssueCategory>,
}

impl Default for HotspotOptions {
  fn default() -> Self {
    Self { radius_meters: 500.0, min_issues: 3, category: None }
  }
}

impl HotspotOptions {
  fn check(&self) -> Result<()> {
    if !self.radius_meters.is_finite() || self.radius_meters < 0.0 {
      return Err(Error::InvalidArgument(format!(
        "radius must be a non-negative number of meters, got {}",
        self.radius_meters
      )));
    }
    if self.min_issues == 0 {
      return Err(Error::InvalidArgument("min_issues must be at least 1".into()));
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HotspotDetector;

impl HotspotDetector {
  pub fn new() -> Self { Self }

  /// Cluster `issues` and return hotspots, largest first.
  ///
  /// Inactive issues, and issues outside `options.category` when set, are
  /// ignored. An empty result is a normal outcome.
  pub fn detect(&self, issues: &[Issue], options: &HotspotOptions) -> Result<Vec<Hotspot>> {
    options.check()?;

    let candidates: Vec<&Issue> = issues
      .iter()
      .filter(|i| i.is_active)
      .filter(|i| options.category.is_none_or(|c| i.category == c))
      .collect();

    let now = Utc::now();
    let mut processed: HashSet<Uuid> = HashSet::new();
    let mut hotspots = Vec::new();

    for seed in &candidates {
      if processed.contains(&seed.id) {
        continue;
      }
      let origin = Coordinate::new(seed.latitude, seed.longitude);

      let neighbors: Vec<&Issue> = candidates
        .iter()
        .copied()
        .filter(|other| other.id != seed.id && !processed.contains(&other.id))
        .filter(|other| options.category.is_none() || other.category == seed.category)
        .filter(|other| {
          geo::is_within_radius(
            &origin,
            &Coordinate::new(other.latitude, other.longitude),
            options.radius_meters,
          )
        })
        .collect();

      if neighbors.len() + 1 < options.min_issues {
        continue;
      }

      let members: Vec<&Issue> = std::iter::once(*seed).chain(neighbors).collect();
      let points: Vec<Coordinate> = members
        .iter()
        .map(|i| Coordinate::new(i.latitude, i.longitude))
        .collect();
      let center = geo::centroid(&points)?;

      processed.extend(members.iter().map(|i| i.id));
      hotspots.push(Hotspot {
        id:            format!("hotspot_{}_{}", seed.category, seed.id),
        center_lat:    center.lat,
        center_lng:    center.lng,
        radius_meters: options.radius_meters,
        issue_count:   members.len(),
        category:      seed.category,
        issue_ids:     members.iter().map(|i| i.id).collect(),
        created_at:    now,
      });
    }

    // Stable: equal-sized clusters keep discovery order.
    hotspots.sort_by(|a, b| b.issue_count.cmp(&a.issue_count));
    Ok(hotspots)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::issue::{IssuePriority, IssueStatus};

  fn issue_at(lat: f64, lng: f64, category: IssueCategory) -> Issue {
    let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    Issue {
      id: Uuid::new_v4(),
      user_id: "u1".into(),
      title: "t".into(),
      description: "d".into(),
      category,
      priority: IssuePriority::Medium,
      status: IssueStatus::Pending,
      latitude: lat,
      longitude: lng,
      address: None,
      image_urls: vec![],
      assigned_to: None,
      created_at: ts,
      updated_at: ts,
      resolved_at: None,
      is_active: true,
    }
  }

  fn pothole(lat: f64, lng: f64) -> Issue { issue_at(lat, lng, IssueCategory::Pothole) }

  fn options(radius_meters: f64, min_issues: usize) -> HotspotOptions {
    HotspotOptions { radius_meters, min_issues, category: None }
  }

  #[test]
  fn three_points_in_a_row_form_one_hotspot() {
    let issues = vec![pothole(0.0, 0.0), pothole(0.0, 0.001), pothole(0.0, 0.002)];

    let hotspots = HotspotDetector::new().detect(&issues, &options(200.0, 3)).unwrap();

    assert_eq!(hotspots.len(), 1);
    let h = &hotspots[0];
    assert_eq!(h.issue_count, 3);
    // The middle point is the first seed that reaches both ends.
    assert_eq!(h.issue_ids[0], issues[1].id);
    let mut ids = h.issue_ids.clone();
    ids.sort();
    let mut expected: Vec<Uuid> = issues.iter().map(|i| i.id).collect();
    expected.sort();
    assert_eq!(ids, expected);
    assert!((h.center_lat - 0.0).abs() < 1e-12);
    assert!((h.center_lng - 0.001).abs() < 1e-12);
    assert_eq!(h.radius_meters, 200.0);
  }

  #[test]
  fn points_beyond_the_radius_never_cluster() {
    // 0.009 degrees of latitude is roughly 1000m.
    let issues = vec![pothole(10.0, 10.0), pothole(10.009, 10.0)];
    let hotspots = HotspotDetector::new().detect(&issues, &options(500.0, 2)).unwrap();
    assert!(hotspots.is_empty());
  }

  #[test]
  fn min_issues_counts_the_seed() {
    let issues = vec![pothole(0.0, 0.0), pothole(0.0, 0.0005)];
    let detector = HotspotDetector::new();
    assert_eq!(detector.detect(&issues, &options(100.0, 2)).unwrap().len(), 1);
    assert!(detector.detect(&issues, &options(100.0, 3)).unwrap().is_empty());
  }

  #[test]
  fn empty_input_is_not_an_error() {
    let hotspots = HotspotDetector::new().detect(&[], &HotspotOptions::default()).unwrap();
    assert!(hotspots.is_empty());
  }

  #[test]
  fn inactive_issues_are_ignored() {
    let mut issues = vec![pothole(0.0, 0.0), pothole(0.0, 0.0001), pothole(0.0, 0.0002)];
    issues[2].is_active = false;
    let hotspots = HotspotDetector::new().detect(&issues, &options(100.0, 3)).unwrap();
    assert!(hotspots.is_empty());
  }

  #[test]
  fn category_filter_restricts_members() {
    let issues = vec![
      pothole(0.0, 0.0),
      issue_at(0.0, 0.0001, IssueCategory::Garbage),
      pothole(0.0, 0.0002),
      issue_at(0.0, 0.0003, IssueCategory::Garbage),
    ];
    let detector = HotspotDetector::new();

    let mixed = detector.detect(&issues, &options(100.0, 4)).unwrap();
    assert_eq!(mixed.len(), 1);
    assert_eq!(mixed[0].category, IssueCategory::Pothole);

    let filtered = detector
      .detect(&issues, &HotspotOptions {
        radius_meters: 100.0,
        min_issues:    2,
        category:      Some(IssueCategory::Garbage),
      })
      .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].category, IssueCategory::Garbage);
    assert_eq!(filtered[0].issue_ids, vec![issues[1].id, issues[3].id]);
  }

  #[test]
  fn hotspots_are_sorted_largest_first() {
    let mut issues = vec![pothole(0.0, 0.0), pothole(0.0, 0.0001)];
    issues.extend((0..4_i32).map(|k| pothole(5.0, 5.0 + f64::from(k) * 0.0001)));

    let hotspots = HotspotDetector::new().detect(&issues, &options(100.0, 2)).unwrap();
    let counts: Vec<usize> = hotspots.iter().map(|h| h.issue_count).collect();
    assert_eq!(counts, vec![4, 2]);
  }

  #[test]
  fn an_issue_joins_at_most_one_hotspot() {
    let issues: Vec<Issue> = (0..9_i32).map(|k| pothole(0.0, f64::from(k) * 0.0009)).collect();
    let hotspots = HotspotDetector::new().detect(&issues, &options(150.0, 2)).unwrap();

    let mut seen = HashSet::new();
    for id in hotspots.iter().flat_map(|h| &h.issue_ids) {
      assert!(seen.insert(*id), "issue {id} placed twice");
    }
  }

  #[test]
  fn result_is_deterministic_for_a_fixed_order() {
    let issues: Vec<Issue> = (0..12_i32)
      .map(|k| pothole(f64::from(k % 3) * 0.0004, f64::from(k / 3) * 0.0004))
      .collect();
    let detector = HotspotDetector::new();
    let first = detector.detect(&issues, &options(60.0, 2)).unwrap();
    let second = detector.detect(&issues, &options(60.0, 2)).unwrap();

    let ids = |hs: &[Hotspot]| hs.iter().map(|h| h.issue_ids.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&first), ids(&second));
  }

  #[test]
  fn seed_order_changes_the_clusters() {
    // A-B-C in a line, 111m apart; radius 150m; min 2.
    let a = pothole(0.0, 0.0);
    let b = pothole(0.0, 0.001);
    let c = pothole(0.0, 0.002);
    let detector = HotspotDetector::new();

    let from_end = detector
      .detect(&[a.clone(), b.clone(), c.clone()], &options(150.0, 2))
      .unwrap();
    assert_eq!(from_end.len(), 1);
    assert_eq!(from_end[0].issue_ids, vec![a.id, b.id]);

    let from_middle = detector
      .detect(&[b.clone(), a.clone(), c.clone()], &options(150.0, 2))
      .unwrap();
    assert_eq!(from_middle.len(), 1);
    assert_eq!(from_middle[0].issue_ids, vec![b.id, a.id, c.id]);
  }

  #[test]
  fn invalid_options_are_rejected() {
    let detector = HotspotDetector::new();
    assert!(matches!(
      detector.detect(&[], &options(-1.0, 3)),
      Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
      detector.detect(&[], &options(f64::NAN, 3)),
      Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
      detector.detect(&[], &options(100.0, 0)),
      Err(Error::InvalidArgument(_))
    ));
  }
}

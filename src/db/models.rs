use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::scoring::Reconciliation;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub team_id: String,
    pub team_name: String,
    pub topic: String,
    pub notes: String,
    pub file_id: String,
    pub file_name: String,
    pub file_size: i64,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub team_id: String,
    pub team_name: String,
    pub topic: String,
    pub notes: String,
    pub file_id: String,
    pub file_name: String,
    pub file_size: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamScore {
    pub bgk: u32,
    pub ai: u32,
    #[serde(rename = "final")]
    pub final_score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeEntry {
    pub judge_id: String,
    pub score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    #[serde(rename = "id")]
    pub team_id: String,
    pub name: String,
    pub members: Vec<String>,
    pub score: TeamScore,
    pub scored_by: Vec<JudgeEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Team {
    pub fn new(team_id: String, name: String, members: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            team_id,
            name,
            members,
            score: TeamScore::default(),
            scored_by: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    // Commit a judge's reconciled score.
    //
    // `scored_by` keeps one entry per judge in first-scored order; a re-score
    // overwrites that judge's entry in place. The team-level `score` always
    // reflects the most recent commit, whichever judge made it.
    pub fn record_score(&mut self, judge_id: &str, reconciliation: &Reconciliation) {
        match self.scored_by.iter_mut().find(|e| e.judge_id == judge_id) {
            Some(entry) => entry.score = reconciliation.final_score,
            None => self.scored_by.push(JudgeEntry {
                judge_id: judge_id.to_string(),
                score: reconciliation.final_score,
            }),
        }

        self.score = TeamScore {
            bgk: reconciliation.bgk,
            ai: reconciliation.ai,
            final_score: reconciliation.final_score,
        };
        self.updated_at = Utc::now();
    }

    pub fn is_scored_by(&self, judge_id: &str) -> bool {
        self.scored_by.iter().any(|e| e.judge_id == judge_id)
    }
}

#[derive(Debug, FromRow)]
pub struct TeamRow {
    pub team_id: String,
    pub name: String,
    pub members: Vec<String>,
    pub score_bgk: i32,
    pub score_ai: i32,
    pub score_final: i32,
    pub scored_by: Json<Vec<JudgeEntry>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TeamRow> for Team {
    fn from(row: TeamRow) -> Self {
        let non_negative = |v: i32| u32::try_from(v).unwrap_or(0);
        Self {
            team_id: row.team_id,
            name: row.name,
            members: row.members,
            score: TeamScore {
                bgk: non_negative(row.score_bgk),
                ai: non_negative(row.score_ai),
                final_score: non_negative(row.score_final),
            },
            scored_by: row.scored_by.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{reconcile, AiSuggestion, Rubric};

    fn team() -> Team {
        Team::new("team-1".into(), "Nong Nghiep 4.0".into(), vec!["An".into()])
    }

    #[test]
    fn rescoring_replaces_the_judges_entry() {
        let mut team = team();
        team.record_score("judge-a", &reconcile(&Rubric::uniform(10), None));
        team.record_score("judge-a", &reconcile(&Rubric::uniform(12), None));

        assert_eq!(team.scored_by.len(), 1);
        assert_eq!(
            team.scored_by[0],
            JudgeEntry {
                judge_id: "judge-a".into(),
                score: 60
            }
        );
        assert_eq!(team.score.final_score, 60);
    }

    #[test]
    fn judges_keep_insertion_order() {
        let mut team = team();
        team.record_score("judge-a", &reconcile(&Rubric::uniform(10), None));
        team.record_score("judge-b", &reconcile(&Rubric::uniform(15), None));
        team.record_score("judge-a", &reconcile(&Rubric::uniform(20), None));

        let ids: Vec<_> = team.scored_by.iter().map(|e| e.judge_id.as_str()).collect();
        assert_eq!(ids, ["judge-a", "judge-b"]);
        assert_eq!(team.scored_by[0].score, 100);
        assert!(team.is_scored_by("judge-b"));
        assert!(!team.is_scored_by("judge-c"));
    }

    #[test]
    fn team_score_is_last_write_wins() {
        let mut team = team();
        let ai = AiSuggestion {
            criteria: Rubric::uniform(16),
            total_score: 80,
            rating: "Tốt".into(),
            feedback: String::new(),
        };
        team.record_score("judge-a", &reconcile(&Rubric::uniform(20), Some(&ai)));
        team.record_score("judge-b", &reconcile(&Rubric::uniform(10), None));

        assert_eq!(team.score, TeamScore { bgk: 50, ai: 0, final_score: 50 });
        assert_eq!(team.scored_by[0].score, 90);
        assert_eq!(team.scored_by[1].score, 50);
    }

    #[test]
    fn team_serializes_with_final_key() {
        let json = serde_json::to_value(team()).unwrap();
        assert_eq!(json["id"], "team-1");
        assert_eq!(json["score"]["final"], 0);
        assert!(json["scoredBy"].as_array().unwrap().is_empty());
    }
}

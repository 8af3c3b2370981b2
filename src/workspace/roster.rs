//! Roster-index maintenance for a course workspace.
//!
//! `Team::members` refers to students by position, so these operations are the
//! only sanctioned way to change the roster: each one either leaves every
//! membership index valid or fails before touching the data.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use thiserror::Error;

use super::{CourseData, Review, ReviewStatus, Student, Team};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("No student at index {0}")]
    StudentNotFound(usize),

    #[error("No team at index {0}")]
    TeamNotFound(usize),

    #[error("No review at index {0}")]
    ReviewNotFound(usize),

    #[error("Please create at least one team first")]
    NoTeams,

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("A student with this ID already exists")]
    DuplicateStudentId,

    #[error("A team with this name already exists")]
    DuplicateTeamName,

    #[error("Student {0} is already assigned to a team")]
    AlreadyAssigned(usize),

    #[error("Student {0} is not assigned to any team")]
    NotAssigned(usize),

    #[error("Team {team} refers to student {index}, which does not exist")]
    DanglingMember { team: usize, index: usize },

    #[error("Student {0} appears in more than one team")]
    DuplicateMembership(usize),

    #[error("Review {review} targets team {team}, which does not exist")]
    DanglingReviewTeam { review: usize, team: usize },
}

impl RosterError {
    /// True when the error names a missing student, team or review
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RosterError::StudentNotFound(_)
                | RosterError::TeamNotFound(_)
                | RosterError::ReviewNotFound(_)
        )
    }
}

/// Result of an auto-assign request that was not rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoAssignOutcome {
    /// Every student already had a team
    NothingToAssign,
    Assigned { count: usize },
}

/// Student fields as submitted by a form
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct StudentInput {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl StudentInput {
    fn into_student(self) -> Result<Student, RosterError> {
        fn required(value: Option<String>, field: &'static str) -> Result<String, RosterError> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(RosterError::MissingField(field))
        }

        Ok(Student {
            id: required(self.id, "Student ID")?,
            name: required(self.name, "Name")?,
            email: required(self.email, "Email")?,
        })
    }
}

/// Review assignment fields as submitted by a form
#[derive(Debug, Clone)]
pub struct ReviewAssignment {
    pub name: String,
    pub template_id: i64,
    pub team_index: Option<usize>,
    pub anonymous_feedback: bool,
}

fn team_name(name: &str) -> Result<String, RosterError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RosterError::MissingField("Team name"));
    }
    Ok(trimmed.to_string())
}

impl CourseData {
    /// Index of the team holding `student`, if any
    pub fn team_of(&self, student: usize) -> Option<usize> {
        self.teams
            .iter()
            .position(|team| team.members.contains(&student))
    }

    /// Student indices not present in any team, ascending
    pub fn unassigned_students(&self) -> Vec<usize> {
        let assigned: HashSet<usize> = self
            .teams
            .iter()
            .flat_map(|team| team.members.iter().copied())
            .collect();

        (0..self.students.len())
            .filter(|index| !assigned.contains(index))
            .collect()
    }

    /// Check a whole document: unique non-blank student ids, valid member
    /// indices with at most one team each, and review targets that exist
    pub fn validate(&self) -> Result<(), RosterError> {
        let mut ids = HashSet::new();
        for student in &self.students {
            if student.id.trim().is_empty() {
                return Err(RosterError::MissingField("Student ID"));
            }
            if !ids.insert(student.id.as_str()) {
                return Err(RosterError::DuplicateStudentId);
            }
        }

        let mut seen = HashSet::new();
        for (team_index, team) in self.teams.iter().enumerate() {
            for &member in &team.members {
                if member >= self.students.len() {
                    return Err(RosterError::DanglingMember {
                        team: team_index,
                        index: member,
                    });
                }
                if !seen.insert(member) {
                    return Err(RosterError::DuplicateMembership(member));
                }
            }
        }

        for (review_index, review) in self.reviews.iter().enumerate() {
            if let Some(team) = review.team_index {
                if team >= self.teams.len() {
                    return Err(RosterError::DanglingReviewTeam {
                        review: review_index,
                        team,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn add_student(&mut self, input: StudentInput) -> Result<usize, RosterError> {
        let student = input.into_student()?;
        if self.students.iter().any(|s| s.id == student.id) {
            return Err(RosterError::DuplicateStudentId);
        }
        self.students.push(student);
        Ok(self.students.len() - 1)
    }

    pub fn edit_student(&mut self, index: usize, input: StudentInput) -> Result<(), RosterError> {
        if index >= self.students.len() {
            return Err(RosterError::StudentNotFound(index));
        }
        let student = input.into_student()?;
        let taken = self
            .students
            .iter()
            .enumerate()
            .any(|(i, s)| i != index && s.id == student.id);
        if taken {
            return Err(RosterError::DuplicateStudentId);
        }
        self.students[index] = student;
        Ok(())
    }

    /// Remove a student and shift every later membership index down by one.
    ///
    /// The removed index is dropped from all teams before renumbering; doing
    /// it the other way round would delete the student that slid into `index`.
    pub fn remove_student(&mut self, index: usize) -> Result<Student, RosterError> {
        if index >= self.students.len() {
            return Err(RosterError::StudentNotFound(index));
        }

        for team in &mut self.teams {
            team.members.retain(|&member| member != index);
            for member in &mut team.members {
                if *member > index {
                    *member -= 1;
                }
            }
        }

        Ok(self.students.remove(index))
    }

    pub fn create_team(&mut self, name: &str) -> Result<usize, RosterError> {
        let name = team_name(name)?;
        if self.teams.iter().any(|t| t.name == name) {
            return Err(RosterError::DuplicateTeamName);
        }
        self.teams.push(Team::new(name));
        Ok(self.teams.len() - 1)
    }

    pub fn rename_team(&mut self, index: usize, name: &str) -> Result<(), RosterError> {
        if index >= self.teams.len() {
            return Err(RosterError::TeamNotFound(index));
        }
        let name = team_name(name)?;
        let taken = self
            .teams
            .iter()
            .enumerate()
            .any(|(i, t)| i != index && t.name == name);
        if taken {
            return Err(RosterError::DuplicateTeamName);
        }
        self.teams[index].name = name;
        Ok(())
    }

    /// Delete a team; its members become unassigned.
    ///
    /// Reviews aimed at a later team keep pointing at the same team, and
    /// reviews aimed at the deleted one fall back to every team.
    pub fn delete_team(&mut self, index: usize) -> Result<Team, RosterError> {
        if index >= self.teams.len() {
            return Err(RosterError::TeamNotFound(index));
        }
        for review in &mut self.reviews {
            review.team_index = match review.team_index {
                Some(t) if t == index => None,
                Some(t) if t > index => Some(t - 1),
                other => other,
            };
        }
        Ok(self.teams.remove(index))
    }

    pub fn add_to_team(&mut self, team: usize, student: usize) -> Result<(), RosterError> {
        if team >= self.teams.len() {
            return Err(RosterError::TeamNotFound(team));
        }
        if student >= self.students.len() {
            return Err(RosterError::StudentNotFound(student));
        }
        if self.team_of(student).is_some() {
            return Err(RosterError::AlreadyAssigned(student));
        }
        self.teams[team].members.push(student);
        Ok(())
    }

    /// Take a student out of their team; returns the team index they left
    pub fn remove_from_team(&mut self, student: usize) -> Result<usize, RosterError> {
        if student >= self.students.len() {
            return Err(RosterError::StudentNotFound(student));
        }
        let team = self
            .team_of(student)
            .ok_or(RosterError::NotAssigned(student))?;
        self.teams[team].members.retain(|&m| m != student);
        Ok(team)
    }

    /// Randomly place every unassigned student into a team.
    ///
    /// Rejected with [`RosterError::NoTeams`] before any change when the
    /// course has no teams.
    pub fn auto_assign<R: Rng + ?Sized>(
        &mut self,
        balance: bool,
        rng: &mut R,
    ) -> Result<AutoAssignOutcome, RosterError> {
        if self.teams.is_empty() {
            return Err(RosterError::NoTeams);
        }

        let mut unassigned = self.unassigned_students();
        if unassigned.is_empty() {
            return Ok(AutoAssignOutcome::NothingToAssign);
        }

        unassigned.shuffle(rng);
        self.assign_in_order(unassigned, balance)
    }

    /// Distribute `order` across teams without shuffling.
    ///
    /// Balanced mode pops from the back of `order` and gives each student to
    /// the smallest team (lowest index on ties). Otherwise the k-th entry goes
    /// to team `k % teams.len()`.
    pub fn assign_in_order(
        &mut self,
        mut order: Vec<usize>,
        balance: bool,
    ) -> Result<AutoAssignOutcome, RosterError> {
        if self.teams.is_empty() {
            return Err(RosterError::NoTeams);
        }
        if order.is_empty() {
            return Ok(AutoAssignOutcome::NothingToAssign);
        }

        let count = order.len();
        if balance {
            while let Some(student) = order.pop() {
                let smallest = self
                    .teams
                    .iter()
                    .enumerate()
                    .min_by_key(|(index, team)| (team.members.len(), *index))
                    .map(|(index, _)| index)
                    .unwrap_or(0);
                self.teams[smallest].members.push(student);
            }
        } else {
            let team_count = self.teams.len();
            for (position, student) in order.into_iter().enumerate() {
                self.teams[position % team_count].members.push(student);
            }
        }

        Ok(AutoAssignOutcome::Assigned { count })
    }

    pub fn assign_review(
        &mut self,
        assignment: ReviewAssignment,
        date_assigned: String,
    ) -> Result<usize, RosterError> {
        let name = assignment.name.trim();
        if name.is_empty() {
            return Err(RosterError::MissingField("Review name"));
        }
        if let Some(team) = assignment.team_index {
            if team >= self.teams.len() {
                return Err(RosterError::TeamNotFound(team));
            }
        }

        self.reviews.push(Review {
            name: name.to_string(),
            template_id: assignment.template_id,
            team_index: assignment.team_index,
            date_assigned,
            status: ReviewStatus::Assigned,
            anonymous_feedback: assignment.anonymous_feedback,
            responses: Vec::new(),
        });
        Ok(self.reviews.len() - 1)
    }

    pub fn delete_review(&mut self, index: usize) -> Result<Review, RosterError> {
        if index >= self.reviews.len() {
            return Err(RosterError::ReviewNotFound(index));
        }
        Ok(self.reviews.remove(index))
    }

    /// Reviews sorted newest first, paired with their stored index.
    ///
    /// Unparsable dates sort last.
    pub fn reviews_newest_first(&self) -> Vec<(usize, &Review)> {
        let mut reviews: Vec<(usize, &Review)> = self.reviews.iter().enumerate().collect();
        reviews.sort_by(|(_, a), (_, b)| {
            let a = chrono::DateTime::parse_from_rfc3339(&a.date_assigned).ok();
            let b = chrono::DateTime::parse_from_rfc3339(&b.date_assigned).ok();
            b.cmp(&a)
        });
        reviews
    }
}

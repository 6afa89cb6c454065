//! Member × agenda vote matrix.
//!
//! Rows are members sorted by name, columns are agendas sorted by id.
//! Each cell holds the mean score of that member's records on that agenda,
//! or the absent score (-2) when there is none.

use crate::error::{Error, Result};
use crate::types::{Agenda, AgendaTally, Member, VoteChoice, VoteRecord};
use ndarray::{Array2, ArrayView1};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct VoteMatrix {
    members: Vec<Member>,
    agendas: Vec<Agenda>,
    /// members × agendas
    values: Array2<f64>,
    /// Last recorded choice per cell, for tallies
    choices: Array2<VoteChoice>,
    member_index: HashMap<String, usize>,
}

impl VoteMatrix {
    /// Pivot vote records into the matrix
    pub fn from_records(records: &[VoteRecord]) -> Result<Self> {
        if records.is_empty() {
            return Err(Error::EmptyData("no vote records".to_string()));
        }

        // Member -> party, first party seen wins
        let mut parties: BTreeMap<&str, &str> = BTreeMap::new();
        let mut agendas: BTreeMap<&str, Agenda> = BTreeMap::new();

        for record in records {
            match parties.get(record.member.as_str()) {
                Some(existing) if *existing != record.party => {
                    warn!(
                        member = %record.member,
                        kept = %existing,
                        ignored = %record.party,
                        "Member listed under more than one party"
                    );
                }
                Some(_) => {}
                None => {
                    parties.insert(&record.member, &record.party);
                }
            }

            let agenda = agendas
                .entry(record.agenda_id.as_str())
                .or_insert_with(|| Agenda {
                    id: record.agenda_id.clone(),
                    name: None,
                    url: None,
                });
            if agenda.name.is_none() {
                agenda.name = record.agenda_name.clone();
            }
            if agenda.url.is_none() {
                agenda.url = record.agenda_url.clone();
            }
        }

        let member_index: HashMap<String, usize> = parties
            .keys()
            .enumerate()
            .map(|(i, name)| (name.to_string(), i))
            .collect();
        let agenda_index: HashMap<&str, usize> = agendas
            .keys()
            .enumerate()
            .map(|(j, id)| (*id, j))
            .collect();

        let (n, d) = (parties.len(), agendas.len());
        let mut sums = Array2::<f64>::zeros((n, d));
        let mut counts = Array2::<u32>::zeros((n, d));
        let mut choices = Array2::from_elem((n, d), VoteChoice::Absent);

        for record in records {
            let i = member_index[record.member.as_str()];
            let j = agenda_index[record.agenda_id.as_str()];
            sums[[i, j]] += record.choice.score();
            counts[[i, j]] += 1;
            choices[[i, j]] = record.choice;
        }

        let duplicates = counts.iter().filter(|&&c| c > 1).count();
        if duplicates > 0 {
            warn!(cells = duplicates, "Duplicate votes for the same member and agenda were averaged");
        }

        let mut values = Array2::from_elem((n, d), VoteChoice::Absent.score());
        ndarray::Zip::from(&mut values)
            .and(&sums)
            .and(&counts)
            .for_each(|v, &s, &c| {
                if c > 0 {
                    *v = s / c as f64;
                }
            });

        let members = parties
            .iter()
            .enumerate()
            .map(|(i, (name, party))| Member {
                name: name.to_string(),
                party: party.to_string(),
                votes_cast: choices
                    .row(i)
                    .iter()
                    .filter(|c| **c != VoteChoice::Absent)
                    .count(),
            })
            .collect();

        info!(members = n, agendas = d, "Built vote matrix");

        Ok(Self {
            members,
            agendas: agendas.into_values().collect(),
            values,
            choices,
            member_index,
        })
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn agendas(&self) -> &[Agenda] {
        &self.agendas
    }

    /// The encoded matrix, one row per member
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn party_of(&self, member: &str) -> Option<&str> {
        self.member_index
            .get(member)
            .map(|&i| self.members[i].party.as_str())
    }

    /// A member's encoded voting history, in agenda order
    pub fn member_votes(&self, member: &str) -> Option<ArrayView1<'_, f64>> {
        self.member_index.get(member).map(|&i| self.values.row(i))
    }

    /// Per-agenda counts of each choice
    pub fn tallies(&self) -> Vec<AgendaTally> {
        self.agendas
            .iter()
            .enumerate()
            .map(|(j, agenda)| {
                let mut tally = AgendaTally {
                    agenda: agenda.clone(),
                    approve: 0,
                    oppose: 0,
                    abstain: 0,
                    absent: 0,
                    approved_by: Vec::new(),
                    opposed_by: Vec::new(),
                    abstained_by: Vec::new(),
                };
                for (member, choice) in self.members.iter().zip(self.choices.column(j)) {
                    match choice {
                        VoteChoice::Approve => {
                            tally.approve += 1;
                            tally.approved_by.push(member.name.clone());
                        }
                        VoteChoice::Oppose => {
                            tally.oppose += 1;
                            tally.opposed_by.push(member.name.clone());
                        }
                        VoteChoice::Abstain => {
                            tally.abstain += 1;
                            tally.abstained_by.push(member.name.clone());
                        }
                        VoteChoice::Absent => tally.absent += 1,
                    }
                }
                tally
            })
            .collect()
    }

    /// Write the pivot table: one row per agenda, one column per member
    pub fn write_pivot_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);

        let mut header = vec!["agenda_id".to_string()];
        header.extend(self.members.iter().map(|m| m.name.clone()));
        wtr.write_record(&header)?;

        for (j, agenda) in self.agendas.iter().enumerate() {
            let mut row = vec![agenda.id.clone()];
            row.extend(self.values.column(j).iter().map(|v| format_score(*v)));
            wtr.write_record(&row)?;
        }

        wtr.flush()?;
        Ok(())
    }
}

fn format_score(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(agenda: &str, member: &str, party: &str, choice: VoteChoice) -> VoteRecord {
        VoteRecord {
            agenda_id: agenda.to_string(),
            agenda_name: None,
            agenda_url: None,
            member: member.to_string(),
            party: party.to_string(),
            choice,
        }
    }

    #[test]
    fn test_pivot_fills_absent() {
        let records = vec![
            record("B2", "kim", "A", VoteChoice::Approve),
            record("B1", "lee", "B", VoteChoice::Oppose),
            record("B1", "kim", "A", VoteChoice::Abstain),
        ];
        let matrix = VoteMatrix::from_records(&records).unwrap();

        assert_eq!(matrix.members()[0].name, "kim");
        assert_eq!(matrix.agendas()[0].id, "B1");
        assert_eq!(matrix.values().shape(), &[2, 2]);

        let kim = matrix.member_votes("kim").unwrap();
        assert_eq!(kim.to_vec(), vec![0.0, 1.0]);
        let lee = matrix.member_votes("lee").unwrap();
        assert_eq!(lee.to_vec(), vec![-1.0, -2.0]);
        assert_eq!(matrix.members()[1].votes_cast, 1);
    }

    #[test]
    fn test_first_party_wins() {
        let records = vec![
            record("B1", "kim", "A", VoteChoice::Approve),
            record("B2", "kim", "C", VoteChoice::Approve),
        ];
        let matrix = VoteMatrix::from_records(&records).unwrap();
        assert_eq!(matrix.members().len(), 1);
        assert_eq!(matrix.party_of("kim"), Some("A"));
        assert_eq!(matrix.party_of("nobody"), None);
    }

    #[test]
    fn test_duplicates_are_averaged() {
        let records = vec![
            record("B1", "kim", "A", VoteChoice::Approve),
            record("B1", "kim", "A", VoteChoice::Oppose),
        ];
        let matrix = VoteMatrix::from_records(&records).unwrap();
        assert_eq!(matrix.values()[[0, 0]], 0.0);
    }

    #[test]
    fn test_empty_records() {
        assert!(matches!(
            VoteMatrix::from_records(&[]),
            Err(Error::EmptyData(_))
        ));
    }

    #[test]
    fn test_tallies() {
        let records = vec![
            record("B1", "kim", "A", VoteChoice::Approve),
            record("B1", "lee", "B", VoteChoice::Approve),
            record("B1", "park", "B", VoteChoice::Oppose),
            record("B2", "park", "B", VoteChoice::Abstain),
        ];
        let matrix = VoteMatrix::from_records(&records).unwrap();
        let tallies = matrix.tallies();

        assert_eq!(tallies.len(), 2);
        assert_eq!(tallies[0].approve, 2);
        assert_eq!(tallies[0].oppose, 1);
        assert_eq!(tallies[0].approved_by, vec!["kim", "lee"]);
        assert_eq!(tallies[1].abstain, 1);
        assert_eq!(tallies[1].absent, 2);
    }

    #[test]
    fn test_write_pivot_csv() {
        let records = vec![
            record("B1", "kim", "A", VoteChoice::Approve),
            record("B2", "lee", "B", VoteChoice::Oppose),
        ];
        let matrix = VoteMatrix::from_records(&records).unwrap();
        let mut out = Vec::new();
        matrix.write_pivot_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "agenda_id,kim,lee\nB1,1,-2\nB2,-2,-1\n");
    }
}

//! Versioned superset schema for Unified Agenda entities.
//!
//! One table drives extraction, column order and per-field normalization so
//! every serializer sees the same shape regardless of which vintage a
//! document came from.

/// Bumped whenever a column is added, removed or reordered
pub const SCHEMA_VERSION: u32 = 2;

/// Entity boundary element
pub const ENTITY_TAG: &str = "RIN_INFO";
/// Identity child of the entity
pub const IDENTITY_TAG: &str = "RIN";
pub const PUBLICATION_TAG: &str = "PUBLICATION";
pub const PUBLICATION_ID_TAG: &str = "PUBLICATION_ID";
pub const PUBLICATION_TITLE_TAG: &str = "PUBLICATION_TITLE";
/// Literal prefix of canonical document names, `REGINFO_RIN_DATA_YYYYMM.xml`
pub const FILENAME_PREFIX: &str = "REGINFO_RIN_DATA_";
/// Field handled by the audited designation backfill
pub const DEFAULT_DESIGNATION_FIELD: &str = "EO_13771_DESIGNATION";

/// Structured-view normalization applied to a scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalizer {
    Text,
    TriState,
    Url,
}

#[derive(Debug, Clone, Copy)]
pub struct ScalarSpec {
    pub tag: &'static str,
    pub normalizer: Normalizer,
}

/// A fixed nested bundle flattened to `<column_prefix>_<FIELD>` columns
#[derive(Debug, Clone, Copy)]
pub struct GroupSpec {
    pub tag: &'static str,
    pub column_prefix: &'static str,
    pub fields: &'static [&'static str],
}

impl GroupSpec {
    pub fn column(&self, field: &str) -> String {
        format!("{}_{}", self.column_prefix, field)
    }
}

/// One-to-many blocks, kept as ordered sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    UnfundedMandates,
    Cfr,
    LegalAuthorities,
    LegalDeadlines,
    Timetable,
    SmallEntities,
    GovtLevels,
    NaicsCodes,
    RelatedRins,
    ChildRins,
    Contacts,
}

#[derive(Debug, Clone, Copy)]
pub struct ListSpec {
    pub container: &'static str,
    pub item: &'static str,
    pub kind: ListKind,
}

impl ListSpec {
    /// Tabular column name; the container tag itself
    pub fn column(&self) -> &'static str {
        self.container
    }
}

pub const AGENCY_FIELDS: &[&str] = &["CODE", "NAME", "ACRONYM"];

pub const AGENCY: GroupSpec = GroupSpec {
    tag: "AGENCY",
    column_prefix: "AGENCY",
    fields: AGENCY_FIELDS,
};

pub const PARENT_AGENCY: GroupSpec = GroupSpec {
    tag: "PARENT_AGENCY",
    column_prefix: "PARENT_AGENCY",
    fields: AGENCY_FIELDS,
};

pub const RPLAN_INFO: GroupSpec = GroupSpec {
    tag: "RPLAN_INFO",
    column_prefix: "RPLAN_INFO",
    fields: &[
        "STMT_OF_NEED",
        "LEGAL_BASIS",
        "ALTERNATIVES",
        "COSTS_AND_BENEFITS",
        "RISKS",
    ],
};

pub const COMPLIANCE_COST: GroupSpec = GroupSpec {
    tag: "COMPLIANCE_COST",
    column_prefix: "COMPLIANCE_COST",
    fields: &["BASE_YEAR", "INITIAL_PUBLIC_COST", "RECURRING_PUBLIC_COST"],
};

pub const GROUPS: &[GroupSpec] = &[AGENCY, PARENT_AGENCY, RPLAN_INFO, COMPLIANCE_COST];

const fn text(tag: &'static str) -> ScalarSpec {
    ScalarSpec {
        tag,
        normalizer: Normalizer::Text,
    }
}

const fn tri_state(tag: &'static str) -> ScalarSpec {
    ScalarSpec {
        tag,
        normalizer: Normalizer::TriState,
    }
}

const fn url(tag: &'static str) -> ScalarSpec {
    ScalarSpec {
        tag,
        normalizer: Normalizer::Url,
    }
}

/// Known scalars: 1995 baseline followed by the 2018-era additions
pub const SCALARS: &[ScalarSpec] = &[
    text("RULE_TITLE"),
    text("ABSTRACT"),
    text("PRIORITY_CATEGORY"),
    text("RIN_STATUS"),
    text("RULE_STAGE"),
    tri_state("MAJOR"),
    text("EO_13771_DESIGNATION"),
    tri_state("FEDERALISM"),
    tri_state("ENERGY_AFFECTED"),
    tri_state("RPLAN_ENTRY"),
    tri_state("RFA_REQUIRED"),
    tri_state("PRINT_PAPER"),
    tri_state("INTERNATIONAL_INTEREST"),
    url("FURTHER_INFO_URL"),
    url("PUBLIC_COMMENT_URL"),
    text("REINVENT_GOVT"),
    text("ADDITIONAL_INFO"),
    text("PROCUREMENT"),
    text("SIC_DESC"),
    text("PARENT_RIN"),
];

pub const LISTS: &[ListSpec] = &[
    ListSpec {
        container: "UNFUNDED_MANDATE_LIST",
        item: "UNFUNDED_MANDATE",
        kind: ListKind::UnfundedMandates,
    },
    ListSpec {
        container: "CFR_LIST",
        item: "CFR",
        kind: ListKind::Cfr,
    },
    ListSpec {
        container: "LEGAL_AUTHORITY_LIST",
        item: "LEGAL_AUTHORITY",
        kind: ListKind::LegalAuthorities,
    },
    ListSpec {
        container: "LEGAL_DLINE_LIST",
        item: "LEGAL_DLINE_INFO",
        kind: ListKind::LegalDeadlines,
    },
    ListSpec {
        container: "TIMETABLE_LIST",
        item: "TIMETABLE",
        kind: ListKind::Timetable,
    },
    ListSpec {
        container: "SMALL_ENTITY_LIST",
        item: "SMALL_ENTITY",
        kind: ListKind::SmallEntities,
    },
    ListSpec {
        container: "GOVT_LEVEL_LIST",
        item: "GOVT_LEVEL",
        kind: ListKind::GovtLevels,
    },
    ListSpec {
        container: "NAICS_LIST",
        item: "NAICS_CD",
        kind: ListKind::NaicsCodes,
    },
    ListSpec {
        container: "RELATED_RIN_LIST",
        item: "RELATED_RIN",
        kind: ListKind::RelatedRins,
    },
    ListSpec {
        container: "CHILD_RIN_LIST",
        item: "CHILD_RIN",
        kind: ListKind::ChildRins,
    },
    ListSpec {
        container: "AGENCY_CONTACT_LIST",
        item: "CONTACT",
        kind: ListKind::Contacts,
    },
];

pub fn list_spec(kind: ListKind) -> &'static ListSpec {
    LISTS
        .iter()
        .find(|spec| spec.kind == kind)
        .unwrap_or(&LISTS[0])
}

pub fn scalar_spec(tag: &str) -> Option<&'static ScalarSpec> {
    SCALARS.iter().find(|spec| spec.tag == tag)
}

/// Where a tabular column's value comes from
#[derive(Debug, Clone, Copy)]
pub enum ColumnSource {
    Identity,
    SnapshotId,
    PublicationTitle,
    SourceXml,
    PubSeason,
    Group(&'static GroupSpec, &'static str),
    Scalar(&'static ScalarSpec),
    List(ListKind),
    LatestAction,
    LatestActionDate,
    HasStatutoryDeadline,
}

impl ColumnSource {
    /// Snapshot-local and list-derived values are never filled from other snapshots
    pub fn is_backfillable(&self) -> bool {
        matches!(self, ColumnSource::Group(..) | ColumnSource::Scalar(_))
    }
}

#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub source: ColumnSource,
}

pub const COL_RIN: &str = "RIN";
pub const COL_PUBLICATION_ID: &str = "PUBLICATION_ID";
pub const COL_PUBLICATION_TITLE: &str = "PUBLICATION_TITLE";
pub const COL_SOURCE_XML: &str = "SOURCE_XML";
pub const COL_PUB_SEASON: &str = "PUB_SEASON";
pub const COL_LATEST_ACTION: &str = "LATEST_ACTION";
pub const COL_LATEST_ACTION_DATE: &str = "LATEST_ACTION_DATE";
pub const COL_HAS_STATUTORY_DEADLINE: &str = "HAS_STATUTORY_DEADLINE";

/// The ordered superset of columns every entity row carries.
///
/// Auto-captured extra fields are appended after these by the table writer.
pub fn columns() -> Vec<ColumnSpec> {
    fn col(name: impl Into<String>, source: ColumnSource) -> ColumnSpec {
        ColumnSpec {
            name: name.into(),
            source,
        }
    }
    fn group_cols(out: &mut Vec<ColumnSpec>, group: &'static GroupSpec) {
        for field in group.fields {
            out.push(col(group.column(field), ColumnSource::Group(group, *field)));
        }
    }
    fn scalar_cols(out: &mut Vec<ColumnSpec>, tags: &[&str]) {
        for tag in tags {
            if let Some(spec) = scalar_spec(tag) {
                out.push(col(spec.tag, ColumnSource::Scalar(spec)));
            }
        }
    }
    fn list_col(out: &mut Vec<ColumnSpec>, kind: ListKind) {
        out.push(col(list_spec(kind).column(), ColumnSource::List(kind)));
    }

    let mut out = vec![
        col(COL_RIN, ColumnSource::Identity),
        col(COL_PUBLICATION_ID, ColumnSource::SnapshotId),
        col(COL_PUBLICATION_TITLE, ColumnSource::PublicationTitle),
        col(COL_SOURCE_XML, ColumnSource::SourceXml),
        col(COL_PUB_SEASON, ColumnSource::PubSeason),
    ];
    group_cols(&mut out, &GROUPS[0]);
    group_cols(&mut out, &GROUPS[1]);
    scalar_cols(
        &mut out,
        &[
            "RULE_TITLE",
            "ABSTRACT",
            "PRIORITY_CATEGORY",
            "RIN_STATUS",
            "RULE_STAGE",
            "MAJOR",
            "EO_13771_DESIGNATION",
            "FEDERALISM",
            "ENERGY_AFFECTED",
        ],
    );
    list_col(&mut out, ListKind::UnfundedMandates);
    list_col(&mut out, ListKind::Cfr);
    list_col(&mut out, ListKind::LegalAuthorities);
    list_col(&mut out, ListKind::LegalDeadlines);
    out.push(col(
        COL_HAS_STATUTORY_DEADLINE,
        ColumnSource::HasStatutoryDeadline,
    ));
    scalar_cols(&mut out, &["RPLAN_ENTRY"]);
    group_cols(&mut out, &GROUPS[2]);
    list_col(&mut out, ListKind::Timetable);
    out.push(col(COL_LATEST_ACTION, ColumnSource::LatestAction));
    out.push(col(COL_LATEST_ACTION_DATE, ColumnSource::LatestActionDate));
    scalar_cols(&mut out, &["RFA_REQUIRED"]);
    list_col(&mut out, ListKind::SmallEntities);
    list_col(&mut out, ListKind::GovtLevels);
    list_col(&mut out, ListKind::NaicsCodes);
    scalar_cols(
        &mut out,
        &[
            "PRINT_PAPER",
            "INTERNATIONAL_INTEREST",
            "FURTHER_INFO_URL",
            "PUBLIC_COMMENT_URL",
        ],
    );
    list_col(&mut out, ListKind::RelatedRins);
    list_col(&mut out, ListKind::ChildRins);
    list_col(&mut out, ListKind::Contacts);
    scalar_cols(
        &mut out,
        &[
            "REINVENT_GOVT",
            "ADDITIONAL_INFO",
            "PROCUREMENT",
            "SIC_DESC",
            "PARENT_RIN",
        ],
    );
    group_cols(&mut out, &GROUPS[3]);
    out
}

/// Column names only, in superset order
pub fn column_names() -> Vec<String> {
    columns().into_iter().map(|c| c.name).collect()
}

/// Top-level tags the flattener claims explicitly; anything else is drift
pub fn is_known_tag(tag: &str) -> bool {
    tag == IDENTITY_TAG
        || tag == PUBLICATION_TAG
        || GROUPS.iter().any(|g| g.tag == tag)
        || SCALARS.iter().any(|s| s.tag == tag)
        || LISTS.iter().any(|l| l.container == tag)
}

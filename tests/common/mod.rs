#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// An entity with every known field populated
pub fn full_entity(rin: &str, publication_id: &str) -> String {
    format!(
        r#"<RIN_INFO>
  <RIN>{rin}</RIN>
  <PUBLICATION><PUBLICATION_ID>{publication_id}</PUBLICATION_ID><PUBLICATION_TITLE>The Regulatory Plan</PUBLICATION_TITLE></PUBLICATION>
  <AGENCY><CODE>2000</CODE><NAME>Environmental Protection Agency</NAME><ACRONYM>EPA</ACRONYM></AGENCY>
  <PARENT_AGENCY><CODE>2000</CODE><NAME>Environmental   Protection
     Agency</NAME><ACRONYM>EPA</ACRONYM></PARENT_AGENCY>
  <RULE_TITLE>Clean Air &amp; Water Standards</RULE_TITLE>
  <ABSTRACT>Sets limits.</ABSTRACT>
  <PRIORITY_CATEGORY>Economically Significant</PRIORITY_CATEGORY>
  <RIN_STATUS>Previously published</RIN_STATUS>
  <RULE_STAGE>Proposed Rule Stage</RULE_STAGE>
  <MAJOR>Yes</MAJOR>
  <EO_13771_DESIGNATION>Regulatory</EO_13771_DESIGNATION>
  <FEDERALISM>Undetermined</FEDERALISM>
  <ENERGY_AFFECTED>No</ENERGY_AFFECTED>
  <UNFUNDED_MANDATE_LIST><UNFUNDED_MANDATE>Private Sector</UNFUNDED_MANDATE></UNFUNDED_MANDATE_LIST>
  <CFR_LIST><CFR>40 CFR 60</CFR><CFR>40 CFR 63</CFR></CFR_LIST>
  <LEGAL_AUTHORITY_LIST><LEGAL_AUTHORITY>42 USC 7401</LEGAL_AUTHORITY></LEGAL_AUTHORITY_LIST>
  <LEGAL_DLINE_LIST><LEGAL_DLINE_INFO><DLINE_TYPE>Statutory</DLINE_TYPE><DLINE_ACTION_STAGE>Final</DLINE_ACTION_STAGE><DLINE_DATE>11/15/1997</DLINE_DATE><DLINE_DESC>Per CAA</DLINE_DESC></LEGAL_DLINE_INFO></LEGAL_DLINE_LIST>
  <RPLAN_ENTRY>Yes</RPLAN_ENTRY>
  <RPLAN_INFO><STMT_OF_NEED>Need</STMT_OF_NEED><LEGAL_BASIS>Basis</LEGAL_BASIS><ALTERNATIVES>None</ALTERNATIVES><COSTS_AND_BENEFITS>Some</COSTS_AND_BENEFITS><RISKS>Low</RISKS></RPLAN_INFO>
  <TIMETABLE_LIST>
    <TIMETABLE><TTBL_ACTION>NPRM</TTBL_ACTION><TTBL_DATE>04/00/1996</TTBL_DATE><FR_CITATION>61 FR 1234</FR_CITATION></TIMETABLE>
    <TIMETABLE><TTBL_ACTION>Final Rule</TTBL_ACTION><TTBL_DATE>To Be Determined</TTBL_DATE></TIMETABLE>
  </TIMETABLE_LIST>
  <RFA_REQUIRED>No</RFA_REQUIRED>
  <SMALL_ENTITY_LIST><SMALL_ENTITY>Businesses</SMALL_ENTITY></SMALL_ENTITY_LIST>
  <GOVT_LEVEL_LIST><GOVT_LEVEL>State</GOVT_LEVEL><GOVT_LEVEL>Local</GOVT_LEVEL></GOVT_LEVEL_LIST>
  <NAICS_LIST><NAICS_CD>221112</NAICS_CD></NAICS_LIST>
  <PRINT_PAPER>Yes</PRINT_PAPER>
  <INTERNATIONAL_INTEREST>No</INTERNATIONAL_INTEREST>
  <FURTHER_INFO_URL>www.epa.gov/air</FURTHER_INFO_URL>
  <PUBLIC_COMMENT_URL>https://www.regulations.gov</PUBLIC_COMMENT_URL>
  <RELATED_RIN_LIST><RELATED_RIN><RIN>2060-AB00</RIN><RIN_RELATION>Related RIN</RIN_RELATION></RELATED_RIN></RELATED_RIN_LIST>
  <CHILD_RIN_LIST><CHILD_RIN><RIN>2060-AC00</RIN><RULE_TITLE>Child Rule</RULE_TITLE></CHILD_RIN></CHILD_RIN_LIST>
  <AGENCY_CONTACT_LIST>
    <CONTACT>
      <PREFIX>Ms.</PREFIX><FIRST_NAME>Jane</FIRST_NAME><MIDDLE_NAME>Q</MIDDLE_NAME><LAST_NAME>Smith</LAST_NAME><SUFFIX>Jr.</SUFFIX>
      <TITLE>Engineer</TITLE>
      <AGENCY><CODE>2060</CODE><NAME>Office of Air</NAME><ACRONYM>OAR</ACRONYM></AGENCY>
      <PHONE>202-555-0100</PHONE><PHONE_EXT>12</PHONE_EXT><TDD_PHONE>202-555-0101</TDD_PHONE><FAX>202-555-0102</FAX>
      <EMAIL>smith.jane@epa.gov</EMAIL>
      <MAILING_ADDRESS><STREET_ADDRESS>1200 Pennsylvania Ave NW</STREET_ADDRESS><CITY>Washington</CITY><STATE>DC</STATE><ZIP>20460</ZIP></MAILING_ADDRESS>
    </CONTACT>
  </AGENCY_CONTACT_LIST>
  <REINVENT_GOVT>No</REINVENT_GOVT>
  <ADDITIONAL_INFO>See docket.</ADDITIONAL_INFO>
  <PROCUREMENT>No</PROCUREMENT>
  <SIC_DESC>4911</SIC_DESC>
  <PARENT_RIN>2060-AA99</PARENT_RIN>
  <COMPLIANCE_COST><BASE_YEAR>2018</BASE_YEAR><INITIAL_PUBLIC_COST>100</INITIAL_PUBLIC_COST><RECURRING_PUBLIC_COST>10</RECURRING_PUBLIC_COST></COMPLIANCE_COST>
  <NEW_FIELD_2024>Captured</NEW_FIELD_2024>
</RIN_INFO>"#
    )
}

/// A minimal entity with an optional agency name and timetable event
pub fn small_entity(rin: &str, agency_name: &str, event: Option<(&str, &str)>) -> String {
    let timetable = event
        .map(|(action, date)| {
            format!(
                "<TIMETABLE_LIST><TIMETABLE><TTBL_ACTION>{}</TTBL_ACTION><TTBL_DATE>{}</TTBL_DATE></TIMETABLE></TIMETABLE_LIST>",
                action, date
            )
        })
        .unwrap_or_default();
    format!(
        "<RIN_INFO><RIN>{}</RIN><AGENCY><NAME>{}</NAME></AGENCY>{}</RIN_INFO>",
        rin, agency_name, timetable
    )
}

pub fn document(entities: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<REGINFO_RIN_DATA>\n{}\n</REGINFO_RIN_DATA>\n",
        entities.join("\n")
    )
}

pub fn write_document(dir: &Path, name: &str, entities: &[String]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, document(entities)).unwrap();
    path
}

//! Shared fixtures for the integration tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

/// Solr index listing `links` as `(file_type, download_link)` pairs
pub fn index_xml(links: &[(&str, &str)]) -> String {
    let docs: String = links
        .iter()
        .enumerate()
        .map(|(i, (file_type, link))| {
            format!(
                r#"<doc>
      <str name="checksum">{i:032x}</str>
      <str name="download_link">{link}</str>
      <date name="publication_date">2021-01-17T00:00:00Z</date>
      <str name="_root_">{file_type}_2021011{i}_01of01.zip</str>
      <str name="file_type">{file_type}</str>
      <str name="file_name">{file_type}_2021011{i}_01of01.zip</str>
      <long name="_version_">16889</long>
    </doc>"#
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<response>
  <lst name="responseHeader"><int name="status">0</int><int name="QTime">1</int></lst>
  <result name="response" numFound="{}" start="0">
    {docs}
  </result>
</response>"#,
        links.len()
    )
}

/// Index with two FULINS entries interleaved with three DLTINS entries
pub fn esma_index(base: &str) -> String {
    index_xml(&[
        ("DLTINS", format!("{base}/files/DLTINS_20210117_01of01.zip").as_str()),
        ("FULINS", format!("{base}/files/FULINS_C_20210117_01of01.zip").as_str()),
        ("DLTINS", format!("{base}/files/DLTINS_20210118_01of01.zip").as_str()),
        ("FULINS", format!("{base}/files/FULINS_D_20210117_01of01.zip").as_str()),
        ("DLTINS", format!("{base}/files/DLTINS_20210119_01of01.zip").as_str()),
    ])
}

/// DLTINS payload: two instrument groups, three instruments.
///
/// The second instrument carries a nested issuer inside its trading venue
/// block that must not override the top-level `Issr`.
pub const INSTRUMENTS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<BizData xmlns="urn:iso:std:iso:20022:tech:xsd:head.003.001.01">
  <Pyld>
    <Document xmlns="urn:iso:std:iso:20022:tech:xsd:auth.036.001.02">
      <FinInstrmRptgRefDataDltaRpt>
        <FinInstrm>
          <TermntdRcrd>
            <FinInstrmGnlAttrbts>
              <Id>DE000A1R07V3</Id>
              <FullNm>Kreditanstalt fuer Wiederaufbau</FullNm>
              <ShrtNm>KFW/1.625 BD 20240115</ShrtNm>
              <ClssfctnTp>DBFTFB</ClssfctnTp>
              <NtnlCcy>EUR</NtnlCcy>
              <CmmdtyDerivInd>false</CmmdtyDerivInd>
            </FinInstrmGnlAttrbts>
            <Issr>549300GDPG70E3MBBU98</Issr>
          </TermntdRcrd>
          <NewRcrd>
            <FinInstrmGnlAttrbts>
              <Id>DE000A1R07X9</Id>
              <FullNm>Lorem ipsum dolor</FullNm>
              <ClssfctnTp>DBFTFB</ClssfctnTp>
              <CmmdtyDerivInd>true</CmmdtyDerivInd>
            </FinInstrmGnlAttrbts>
            <Issr>549300GDPG70E3MBBU98</Issr>
            <TradgVnRltdAttrbts><Issr>OTHER</Issr></TradgVnRltdAttrbts>
          </NewRcrd>
        </FinInstrm>
        <FinInstrm>
          <ModfdRcrd>
            <FinInstrmGnlAttrbts>
              <Id>XS0000000001</Id>
              <FullNm>There is one lowercase A here</FullNm>
              <NtnlCcy>USD</NtnlCcy>
            </FinInstrmGnlAttrbts>
          </ModfdRcrd>
        </FinInstrm>
      </FinInstrmRptgRefDataDltaRpt>
    </Document>
  </Pyld>
</BizData>"#;

/// ZIP archive holding `content` as its single entry
pub fn package_zip(entry_name: &str, content: &str) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(entry_name, SimpleFileOptions::default())
        .unwrap();
    writer.write_all(content.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

/// Write a secret file with the given permission bits
pub fn secret_file(dir: &Path, name: &str, content: &str, mode: u32) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
    }
    #[cfg(not(unix))]
    let _ = mode;

    path
}

/// Permission checks do not apply to root
pub fn running_as_root() -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        std::fs::metadata("/proc/self")
            .map(|m| m.uid() == 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        false
    }
}

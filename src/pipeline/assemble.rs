/// Assemble per-chunk transcriptions into one raw transcript.
///
/// Pieces are ordered by chunk index, not by arrival or processing order,
/// so any permutation of submission order reconstructs the same transcript.
/// Empty pieces (silent or skipped chunks) contribute nothing.
pub fn assemble_transcript(mut pieces: Vec<(u32, String)>) -> String {
    pieces.sort_by_key(|(index, _)| *index);

    let texts: Vec<&str> = pieces
        .iter()
        .map(|(_, text)| text.trim())
        .filter(|text| !text.is_empty())
        .collect();

    texts.join("\n")
}

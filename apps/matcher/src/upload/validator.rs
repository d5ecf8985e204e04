use tracing::debug;

use super::{SelectedFile, UploadError, MAX_RESUMES};

/// Files chosen so far. Every mutation either succeeds completely or leaves
/// the selection as it was, except for the job-description slot which is
/// emptied when a replacement is rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingUpload {
    job_description: Option<SelectedFile>,
    resumes: Vec<SelectedFile>,
}

/// A complete selection, ready to be packaged as multipart.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub job_description: SelectedFile,
    pub resumes: Vec<SelectedFile>,
}

impl PendingUpload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_description(&self) -> Option<&SelectedFile> {
        self.job_description.as_ref()
    }

    pub fn resumes(&self) -> &[SelectedFile] {
        &self.resumes
    }

    /// Replaces the job description with the first file of `selection`.
    /// An empty selection changes nothing.
    pub fn select_job_description(
        &mut self,
        selection: Vec<SelectedFile>,
    ) -> Result<(), UploadError> {
        let Some(file) = selection.into_iter().next() else {
            return Ok(());
        };

        if file.is_too_large() {
            self.job_description = None;
            return Err(UploadError::FileTooLarge {
                files: vec![file.name],
            });
        }

        if !file.is_supported_type() {
            self.job_description = None;
            return Err(UploadError::UnsupportedType {
                files: vec![file.name],
            });
        }

        debug!("Job description selected: {}", file.name);
        self.job_description = Some(file);
        Ok(())
    }

    pub fn remove_job_description(&mut self) {
        self.job_description = None;
    }

    /// Appends a batch of resumes.
    ///
    /// Checks run in order: combined count, size, media type, then duplicates
    /// by `(name, size)` against the held set and earlier files of the same
    /// batch. The combined count is the held set plus the batch files that
    /// survive deduplication, so two held resumes plus a batch of two where
    /// one is already held ends at three rather than failing the cap. A batch
    /// that fails any check is rejected whole.
    pub fn add_resumes(&mut self, batch: Vec<SelectedFile>) -> Result<(), UploadError> {
        let keep = self.fresh_mask(&batch);
        let incoming = keep.iter().filter(|k| **k).count();
        if self.resumes.len() + incoming > MAX_RESUMES {
            return Err(UploadError::TooManyFiles { max: MAX_RESUMES });
        }

        let oversized: Vec<String> = batch
            .iter()
            .filter(|f| f.is_too_large())
            .map(|f| f.name.clone())
            .collect();
        if !oversized.is_empty() {
            return Err(UploadError::FileTooLarge { files: oversized });
        }

        let unsupported: Vec<String> = batch
            .iter()
            .filter(|f| !f.is_supported_type())
            .map(|f| f.name.clone())
            .collect();
        if !unsupported.is_empty() {
            return Err(UploadError::UnsupportedType { files: unsupported });
        }

        let fresh: Vec<SelectedFile> = batch
            .into_iter()
            .zip(keep)
            .filter_map(|(file, keep)| keep.then_some(file))
            .collect();
        if fresh.is_empty() {
            return Err(UploadError::NoNewFiles);
        }

        debug!("Adding {} resume(s)", fresh.len());
        self.resumes.extend(fresh);
        Ok(())
    }

    fn fresh_mask(&self, batch: &[SelectedFile]) -> Vec<bool> {
        batch
            .iter()
            .enumerate()
            .map(|(i, file)| {
                let held = self.resumes.iter().any(|h| h.same_file_as(file));
                let repeated = batch[..i].iter().any(|earlier| earlier.same_file_as(file));
                !held && !repeated
            })
            .collect()
    }

    /// Removes the resume at `index`. Out-of-range indices are ignored.
    pub fn remove_resume(&mut self, index: usize) -> Option<SelectedFile> {
        (index < self.resumes.len()).then(|| self.resumes.remove(index))
    }

    pub fn reset(&mut self) {
        self.job_description = None;
        self.resumes.clear();
    }

    pub fn is_complete(&self) -> bool {
        self.job_description.is_some() && !self.resumes.is_empty()
    }

    /// Snapshot of a complete selection for submission. The selection itself
    /// is kept until the caller resets it after a successful upload.
    pub fn submission(&self) -> Result<Submission, UploadError> {
        match (&self.job_description, self.resumes.is_empty()) {
            (Some(job_description), false) => Ok(Submission {
                job_description: job_description.clone(),
                resumes: self.resumes.clone(),
            }),
            _ => Err(UploadError::IncompleteSelection),
        }
    }
}

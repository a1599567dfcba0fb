mod package;
mod storage;
